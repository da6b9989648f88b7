//! Defines the core data model and database queries for budgets.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{BudgetId, CategoryId},
};

/// A monthly spending limit for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The month the limit applies to, in YYYY-MM format.
    pub month: String,
    /// The category the limit applies to.
    pub category_id: CategoryId,
    /// The most that should be spent in the category this month.
    pub limit_amount: f64,
}

/// The request body for creating a budget.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetForm {
    /// The month the limit applies to, in YYYY-MM format.
    pub month: String,
    /// The category the limit applies to.
    pub category_id: CategoryId,
    /// The most that should be spent in the category this month.
    pub limit_amount: f64,
}

/// The request body for editing a budget. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdate {
    /// The new month.
    pub month: Option<String>,
    /// The new category.
    pub category_id: Option<CategoryId>,
    /// The new limit.
    pub limit_amount: Option<f64>,
}

/// Check that `month` is a plausible YYYY-MM string.
fn validate_month(month: &str) -> Result<(), Error> {
    let invalid = || Error::InvalidMonth(month.to_owned());

    let (year, month_number) = month.split_once('-').ok_or_else(invalid)?;

    if year.len() != 4 || !year.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }

    match month_number.len() == 2 {
        true => match month_number.parse::<u8>() {
            Ok(1..=12) => Ok(()),
            _ => Err(invalid()),
        },
        false => Err(invalid()),
    }
}

/// Create a budget and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidMonth] if the month is not a YYYY-MM string,
/// - [Error::NonPositiveAmount] if the limit is zero or negative,
/// - [Error::InvalidForeignKey] if the category does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(form: &BudgetForm, connection: &Connection) -> Result<Budget, Error> {
    validate_month(&form.month)?;

    if form.limit_amount <= 0.0 {
        return Err(Error::NonPositiveAmount {
            field: "limit amount",
            value: form.limit_amount,
        });
    }

    connection.execute(
        "INSERT INTO budget (month, category_id, limit_amount, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            form.month,
            form.category_id,
            form.limit_amount,
            OffsetDateTime::now_utc()
        ],
    )?;

    let id = connection.last_insert_rowid();

    Ok(Budget {
        id,
        month: form.month.clone(),
        category_id: form.category_id,
        limit_amount: form.limit_amount,
    })
}

/// Retrieve a single budget by ID.
pub fn get_budget(budget_id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare("SELECT id, month, category_id, limit_amount FROM budget WHERE id = :id")?
        .query_row(&[(":id", &budget_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve budgets, optionally restricted to one month, newest first.
pub fn list_budgets(month: Option<&str>, connection: &Connection) -> Result<Vec<Budget>, Error> {
    if let Some(month) = month {
        validate_month(month)?;

        return connection
            .prepare(
                "SELECT id, month, category_id, limit_amount FROM budget
                 WHERE month = :month ORDER BY created_at DESC",
            )?
            .query_map(&[(":month", &month)], map_row)?
            .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
            .collect();
    }

    connection
        .prepare("SELECT id, month, category_id, limit_amount FROM budget ORDER BY created_at DESC")?
        .query_map([], map_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Merge `update` into the stored budget. Returns an error if the budget
/// doesn't exist.
pub fn update_budget(
    budget_id: BudgetId,
    update: BudgetUpdate,
    connection: &Connection,
) -> Result<Budget, Error> {
    let current = get_budget(budget_id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingBudget,
        error => error,
    })?;

    if let Some(month) = &update.month {
        validate_month(month)?;
    }

    if let Some(limit_amount) = update.limit_amount {
        if limit_amount <= 0.0 {
            return Err(Error::NonPositiveAmount {
                field: "limit amount",
                value: limit_amount,
            });
        }
    }

    let budget = Budget {
        id: budget_id,
        month: update.month.unwrap_or(current.month),
        category_id: update.category_id.unwrap_or(current.category_id),
        limit_amount: update.limit_amount.unwrap_or(current.limit_amount),
    };

    connection.execute(
        "UPDATE budget SET month = ?1, category_id = ?2, limit_amount = ?3 WHERE id = ?4",
        params![budget.month, budget.category_id, budget.limit_amount, budget_id],
    )?;

    Ok(budget)
}

/// Delete a budget by ID. Returns an error if the budget doesn't exist.
pub fn delete_budget(budget_id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", [budget_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            month TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            limit_amount REAL NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        month: row.get(1)?,
        category_id: row.get(2)?,
        limit_amount: row.get(3)?,
    })
}
