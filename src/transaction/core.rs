//! Defines the core data model and database queries for ledger transactions.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{AccountId, CategoryId, PaymentId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

impl TransactionType {
    /// The lowercase string stored in the database for this transaction type.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// Parse the stored database representation of a transaction type.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            _ => None,
        }
    }
}

/// Whether a transaction has cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The movement has happened.
    Confirmed,
    /// The movement is expected but has not cleared yet.
    Pending,
}

impl TransactionStatus {
    /// The lowercase string stored in the database for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Pending => "pending",
        }
    }

    /// Parse the stored database representation of a transaction status.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "confirmed" => Some(TransactionStatus::Confirmed),
            "pending" => Some(TransactionStatus::Pending),
            _ => None,
        }
    }
}

/// How a transaction was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Paid in cash.
    Cash,
    /// Paid by card.
    Card,
    /// Paid by bank transfer.
    Transfer,
    /// Paid some other way.
    Other,
}

impl PaymentMethod {
    /// The lowercase string stored in the database for this payment method.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Other => "other",
        }
    }

    /// Parse the stored database representation of a payment method.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "transfer" => Some(PaymentMethod::Transfer),
            "other" => Some(PaymentMethod::Other),
            _ => None,
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the money moved.
    pub date: Date,
    /// Whether money came in or went out.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// The ISO 4217 currency code of the amount.
    pub currency: String,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// How the transaction was paid.
    pub method: PaymentMethod,
    /// Whether the transaction has cleared.
    pub status: TransactionStatus,
    /// Free-form labels for filtering.
    pub tags: Vec<String>,
    /// The credit payment whose settlement generated this row, if any.
    ///
    /// Ordinary ledger rows leave this unset; the settlement engine fills it
    /// in so the payment → ledger link is queryable instead of being
    /// reconstructed from matching descriptions and amounts.
    pub source_payment_id: Option<PaymentId>,
    /// When the row was recorded.
    pub created_at: OffsetDateTime,
}

/// The fields needed to append a new transaction to the ledger.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// When the money moved.
    pub date: Date,
    /// Whether money came in or went out.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// The ISO 4217 currency code, defaults to MXN.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
    /// How the transaction was paid.
    pub method: PaymentMethod,
    /// Whether the transaction has cleared.
    pub status: TransactionStatus,
    /// Free-form labels for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The credit payment that generated this row. Never set by clients.
    #[serde(skip)]
    pub source_payment_id: Option<PaymentId>,
}

fn default_currency() -> String {
    "MXN".to_owned()
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Append a new transaction to the ledger.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::InvalidForeignKey] if the category or account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn append_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.amount <= 0.0 {
        return Err(Error::NonPositiveAmount {
            field: "amount",
            value: new_transaction.amount,
        });
    }

    let tags_json = serde_json::to_string(&new_transaction.tags)
        .expect("a vector of strings always serializes");
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO \"transaction\"
         (date, type, amount, currency, category_id, account_id, description, method, status, tags, source_payment_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            new_transaction.date,
            new_transaction.kind.as_str(),
            new_transaction.amount,
            new_transaction.currency,
            new_transaction.category_id,
            new_transaction.account_id,
            new_transaction.description,
            new_transaction.method.as_str(),
            new_transaction.status.as_str(),
            tags_json,
            new_transaction.source_payment_id,
            created_at,
        ],
    )?;

    let id = connection.last_insert_rowid();

    Ok(Transaction {
        id,
        date: new_transaction.date,
        kind: new_transaction.kind,
        amount: new_transaction.amount,
        currency: new_transaction.currency,
        category_id: new_transaction.category_id,
        account_id: new_transaction.account_id,
        description: new_transaction.description,
        method: new_transaction.method,
        status: new_transaction.status,
        tags: new_transaction.tags,
        source_payment_id: new_transaction.source_payment_id,
        created_at,
    })
}

/// Retrieve a transaction from the ledger by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, date, type, amount, currency, category_id, account_id, description, method, status, tags, source_payment_id, created_at
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Get the total number of transactions in the ledger.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\"", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            type TEXT NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            method TEXT NOT NULL,
            status TEXT NOT NULL,
            tags TEXT NOT NULL,
            source_payment_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id),
            FOREIGN KEY(account_id) REFERENCES account(id),
            FOREIGN KEY(source_payment_id) REFERENCES credit_payment(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let date = row.get(1)?;

    let raw_kind: String = row.get(2)?;
    let kind = TransactionType::parse(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown transaction type \"{raw_kind}\"").into(),
        )
    })?;

    let amount = row.get(3)?;
    let currency = row.get(4)?;
    let category_id = row.get(5)?;
    let account_id = row.get(6)?;
    let description = row.get(7)?;

    let raw_method: String = row.get(8)?;
    let method = PaymentMethod::parse(&raw_method).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown payment method \"{raw_method}\"").into(),
        )
    })?;

    let raw_status: String = row.get(9)?;
    let status = TransactionStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            format!("unknown transaction status \"{raw_status}\"").into(),
        )
    })?;

    let raw_tags: String = row.get(10)?;
    let tags = serde_json::from_str(&raw_tags).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })?;

    let source_payment_id = row.get(11)?;
    let created_at = row.get(12)?;

    Ok(Transaction {
        id,
        date,
        kind,
        amount,
        currency,
        category_id,
        account_id,
        description,
        method,
        status,
        tags,
        source_payment_id,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
