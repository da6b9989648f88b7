//! Defines the endpoint for editing an account.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params};
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::core::{Account, AccountType, get_account},
    database_id::AccountId,
};

/// The state needed to edit an account.
#[derive(Debug, Clone)]
pub struct EditAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for editing an account. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    /// The new account name.
    pub name: Option<String>,
    /// The new kind of account.
    #[serde(rename = "type")]
    pub kind: Option<AccountType>,
    /// The new starting balance.
    pub initial_balance: Option<f64>,
    /// The new notes.
    pub notes: Option<String>,
}

/// A route handler for editing an account.
pub async fn edit_account_endpoint(
    State(state): State<EditAccountState>,
    Path(account_id): Path<AccountId>,
    Json(update): Json<AccountUpdate>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_account(account_id, update, &connection) {
        Ok(account) => Json(account).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Merge `update` into the stored account and return the updated row.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingAccount] if `id` does not refer to a valid account,
/// - [Error::EmptyName] if the new name is blank,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_account(
    id: AccountId,
    update: AccountUpdate,
    connection: &Connection,
) -> Result<Account, Error> {
    let current = get_account(id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingAccount,
        error => error,
    })?;

    let name = match update.name {
        Some(name) => {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(Error::EmptyName("account name"));
            }
            name
        }
        None => current.name,
    };

    let account = Account {
        id,
        name,
        kind: update.kind.unwrap_or(current.kind),
        initial_balance: update.initial_balance.unwrap_or(current.initial_balance),
        notes: update.notes.unwrap_or(current.notes),
    };

    connection.execute(
        "UPDATE account SET name = ?1, type = ?2, balance = ?3, notes = ?4 WHERE id = ?5",
        params![
            account.name,
            account.kind.as_str(),
            account.initial_balance,
            account.notes,
            id
        ],
    )?;

    Ok(account)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        account::{AccountForm, AccountType, create_account, get_account},
        db::initialize,
    };

    use super::{AccountUpdate, update_account};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn updates_only_provided_fields() {
        let conn = get_test_connection();
        let account = create_account(
            &AccountForm {
                name: "Checking".to_owned(),
                kind: AccountType::Bank,
                initial_balance: Some(100.0),
                notes: "main".to_owned(),
            },
            &conn,
        )
        .unwrap();

        let updated = update_account(
            account.id,
            AccountUpdate {
                initial_balance: Some(250.0),
                ..Default::default()
            },
            &conn,
        )
        .expect("Could not update account");

        assert_eq!(updated.name, "Checking");
        assert_eq!(updated.kind, AccountType::Bank);
        assert_eq!(updated.initial_balance, 250.0);
        assert_eq!(updated.notes, "main");
        assert_eq!(get_account(account.id, &conn), Ok(updated));
    }

    #[test]
    fn update_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = update_account(999_999, AccountUpdate::default(), &conn);

        assert_eq!(result, Err(Error::UpdateMissingAccount));
    }

    #[test]
    fn update_rejects_blank_name() {
        let conn = get_test_connection();
        let account = create_account(
            &AccountForm {
                name: "Checking".to_owned(),
                kind: AccountType::Bank,
                initial_balance: None,
                notes: String::new(),
            },
            &conn,
        )
        .unwrap();

        let result = update_account(
            account.id,
            AccountUpdate {
                name: Some("  ".to_owned()),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::EmptyName("account name")));
    }
}
