//! Filtered queries over the ledger.

use rusqlite::{Connection, types::Value};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    database_id::{AccountId, CategoryId},
    transaction::core::{Transaction, TransactionStatus, TransactionType, map_transaction_row},
};

/// Optional filters for listing ledger transactions.
///
/// All fields combine with AND; an empty query returns the whole ledger.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    /// Only include transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only include transactions on or before this date.
    pub end_date: Option<Date>,
    /// Only include transactions of this type.
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    /// Only include transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only include transactions on this account.
    pub account_id: Option<AccountId>,
    /// Only include transactions with this status.
    pub status: Option<TransactionStatus>,
    /// Only include transactions whose description contains this text.
    pub search: Option<String>,
}

/// Retrieve ledger transactions matching `query`, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_transactions(
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut clauses = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(start_date) = query.start_date {
        params.push(Value::Text(start_date.to_string()));
        clauses.push(format!("date >= ?{}", params.len()));
    }

    if let Some(end_date) = query.end_date {
        params.push(Value::Text(end_date.to_string()));
        clauses.push(format!("date <= ?{}", params.len()));
    }

    if let Some(kind) = query.kind {
        params.push(Value::Text(kind.as_str().to_owned()));
        clauses.push(format!("type = ?{}", params.len()));
    }

    if let Some(category_id) = query.category_id {
        params.push(Value::Integer(category_id));
        clauses.push(format!("category_id = ?{}", params.len()));
    }

    if let Some(account_id) = query.account_id {
        params.push(Value::Integer(account_id));
        clauses.push(format!("account_id = ?{}", params.len()));
    }

    if let Some(status) = query.status {
        params.push(Value::Text(status.as_str().to_owned()));
        clauses.push(format!("status = ?{}", params.len()));
    }

    if let Some(search) = &query.search {
        params.push(Value::Text(format!("%{search}%")));
        clauses.push(format!("description LIKE ?{}", params.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    // Sort by date, then creation time, to keep row order stable.
    let sql = format!(
        "SELECT id, date, type, amount, currency, category_id, account_id, description, method, status, tags, source_payment_id, created_at
         FROM \"transaction\" {where_clause} ORDER BY date DESC, created_at DESC, id DESC"
    );

    connection
        .prepare(&sql)?
        .query_map(rusqlite::params_from_iter(params), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}
