//! Defines the endpoint for creating a new account.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params};
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::core::{Account, AccountType},
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating an account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountForm {
    /// The account name.
    pub name: String,
    /// The kind of account.
    #[serde(rename = "type")]
    pub kind: AccountType,
    /// The balance the account starts with, defaults to zero.
    #[serde(default)]
    pub initial_balance: Option<f64>,
    /// Free-form notes, defaults to an empty string.
    #[serde(default)]
    pub notes: String,
}

/// A route handler for creating a new account.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    Json(form): Json<AccountForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_account(&form, &connection) {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Insert a new account into the database.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the account name is blank,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_account(form: &AccountForm, connection: &Connection) -> Result<Account, Error> {
    let name = form.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName("account name"));
    }

    let initial_balance = form.initial_balance.unwrap_or(0.0);

    connection.execute(
        "INSERT INTO account (name, type, balance, notes) VALUES (?1, ?2, ?3, ?4)",
        params![name, form.kind.as_str(), initial_balance, form.notes],
    )?;

    let id = connection.last_insert_rowid();

    Ok(Account {
        id,
        name: name.to_owned(),
        kind: form.kind,
        initial_balance,
        notes: form.notes.clone(),
    })
}
