//! Defines the endpoint for editing a ledger transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    database_id::{AccountId, CategoryId, TransactionId},
    transaction::core::{
        PaymentMethod, Transaction, TransactionStatus, TransactionType, get_transaction,
    },
};

/// The state needed to edit a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for editing a transaction. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    /// The new date.
    pub date: Option<Date>,
    /// The new transaction type.
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    /// The new amount.
    pub amount: Option<f64>,
    /// The new currency code.
    pub currency: Option<String>,
    /// The new category.
    pub category_id: Option<CategoryId>,
    /// The new account.
    pub account_id: Option<AccountId>,
    /// The new description.
    pub description: Option<String>,
    /// The new payment method.
    pub method: Option<PaymentMethod>,
    /// The new status.
    pub status: Option<TransactionStatus>,
    /// The new tags.
    pub tags: Option<Vec<String>>,
}

/// A route handler for editing a ledger transaction.
pub async fn edit_transaction_endpoint(
    State(state): State<EditTransactionState>,
    Path(transaction_id): Path<TransactionId>,
    Json(update): Json<TransactionUpdate>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_transaction(transaction_id, update, &connection) {
        Ok(transaction) => Json(transaction).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Merge `update` into the stored transaction and return the updated row.
///
/// The settlement link (`source_payment_id`) is not editable.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a valid
///   transaction,
/// - [Error::NonPositiveAmount] if the new amount is zero or negative,
/// - [Error::InvalidForeignKey] if the new category or account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let current = get_transaction(id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingTransaction,
        error => error,
    })?;

    if let Some(amount) = update.amount {
        if amount <= 0.0 {
            return Err(Error::NonPositiveAmount {
                field: "amount",
                value: amount,
            });
        }
    }

    let transaction = Transaction {
        id,
        date: update.date.unwrap_or(current.date),
        kind: update.kind.unwrap_or(current.kind),
        amount: update.amount.unwrap_or(current.amount),
        currency: update.currency.unwrap_or(current.currency),
        category_id: update.category_id.unwrap_or(current.category_id),
        account_id: update.account_id.unwrap_or(current.account_id),
        description: update.description.unwrap_or(current.description),
        method: update.method.unwrap_or(current.method),
        status: update.status.unwrap_or(current.status),
        tags: update.tags.unwrap_or(current.tags),
        source_payment_id: current.source_payment_id,
        created_at: current.created_at,
    };

    let tags_json =
        serde_json::to_string(&transaction.tags).expect("a vector of strings always serializes");

    connection.execute(
        "UPDATE \"transaction\"
         SET date = ?1, type = ?2, amount = ?3, currency = ?4, category_id = ?5, account_id = ?6,
             description = ?7, method = ?8, status = ?9, tags = ?10
         WHERE id = ?11",
        params![
            transaction.date,
            transaction.kind.as_str(),
            transaction.amount,
            transaction.currency,
            transaction.category_id,
            transaction.account_id,
            transaction.description,
            transaction.method.as_str(),
            transaction.status.as_str(),
            tags_json,
            id,
        ],
    )?;

    Ok(transaction)
}
