//! Defines the core data model and database queries for accounts.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::AccountId};

/// The kind of place an account's money lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Physical cash.
    Cash,
    /// A bank account.
    Bank,
    /// A credit or debit card.
    Card,
}

impl AccountType {
    /// The lowercase string stored in the database for this account type.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Cash => "cash",
            AccountType::Bank => "bank",
            AccountType::Card => "card",
        }
    }

    /// Parse the stored database representation of an account type.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "cash" => Some(AccountType::Cash),
            "bank" => Some(AccountType::Bank),
            "card" => Some(AccountType::Card),
            _ => None,
        }
    }
}

/// A place money can be held and paid from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The name of the account.
    pub name: String,
    /// The kind of account.
    #[serde(rename = "type")]
    pub kind: AccountType,
    /// The balance the account started with when it was added.
    pub initial_balance: f64,
    /// Free-form notes about the account.
    pub notes: String,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            balance REAL NOT NULL,
            notes TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let raw_kind: String = row.get(2)?;
    let kind = AccountType::parse(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown account type \"{raw_kind}\"").into(),
        )
    })?;
    let initial_balance = row.get(3)?;
    let notes = row.get(4)?;

    Ok(Account {
        id,
        name,
        kind,
        initial_balance,
        notes,
    })
}

/// Retrieve an account from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare("SELECT id, name, type, balance, notes FROM account WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row_to_account)?;

    Ok(account)
}

/// Check whether an account with `id` exists.
///
/// The settlement engine calls this before appending to the ledger so a
/// payment can never reference a non-existent account.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn account_exists(id: AccountId, connection: &Connection) -> Result<bool, Error> {
    let exists = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM account WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;

    Ok(exists)
}


#[cfg(test)]
mod account_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        account::{AccountForm, AccountType, create_account},
        db::initialize,
    };

    use super::{account_exists, get_account};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn get_account_succeeds() {
        let conn = get_test_connection();
        let inserted = create_account(
            &AccountForm {
                name: "Checking".to_owned(),
                kind: AccountType::Bank,
                initial_balance: Some(1_000.0),
                notes: String::new(),
            },
            &conn,
        )
        .unwrap();

        let selected = get_account(inserted.id, &conn);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_account_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let selected = get_account(1337, &conn);

        assert_eq!(selected, Err(Error::NotFound));
    }

    #[test]
    fn account_exists_reflects_database_state() {
        let conn = get_test_connection();
        let inserted = create_account(
            &AccountForm {
                name: "Wallet".to_owned(),
                kind: AccountType::Cash,
                initial_balance: None,
                notes: String::new(),
            },
            &conn,
        )
        .unwrap();

        assert_eq!(account_exists(inserted.id, &conn), Ok(true));
        assert_eq!(account_exists(inserted.id + 1, &conn), Ok(false));
    }
}
