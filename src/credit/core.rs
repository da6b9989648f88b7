//! Defines the core data model and database queries for credits.

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, database_id::CreditId};

// ============================================================================
// MODELS
// ============================================================================

/// How often an installment on a credit comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    /// An installment every 7 days.
    Weekly,
    /// An installment every 14 days.
    Biweekly,
    /// An installment every calendar month.
    Monthly,
    /// An installment every calendar year.
    Yearly,
}

impl PaymentFrequency {
    /// The lowercase string stored in the database for this frequency.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentFrequency::Weekly => "weekly",
            PaymentFrequency::Biweekly => "biweekly",
            PaymentFrequency::Monthly => "monthly",
            PaymentFrequency::Yearly => "yearly",
        }
    }

    /// Parse a stored frequency, falling back to monthly for anything
    /// unrecognized.
    ///
    /// The fallback means a row written by an older or newer version of the
    /// schema still rolls its due date forward instead of failing the whole
    /// settlement.
    pub fn parse_or_monthly(text: &str) -> Self {
        match text {
            "weekly" => PaymentFrequency::Weekly,
            "biweekly" => PaymentFrequency::Biweekly,
            "yearly" => PaymentFrequency::Yearly,
            _ => PaymentFrequency::Monthly,
        }
    }
}

/// Where a credit is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    /// The credit still has a balance to pay off.
    Active,
    /// The balance has reached zero.
    Paid,
    /// The credit has fallen behind its schedule.
    Overdue,
}

impl CreditStatus {
    /// The lowercase string stored in the database for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            CreditStatus::Active => "active",
            CreditStatus::Paid => "paid",
            CreditStatus::Overdue => "overdue",
        }
    }

    /// Parse the stored database representation of a credit status.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "active" => Some(CreditStatus::Active),
            "paid" => Some(CreditStatus::Paid),
            "overdue" => Some(CreditStatus::Overdue),
            _ => None,
        }
    }
}

/// An installment loan tracked by the system.
///
/// A credit's `remaining_amount`, `next_payment_date`, and `status` are only
/// written by the settlement engine or an explicit edit; every settlement
/// changes all three together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    /// The ID of the credit.
    pub id: CreditId,
    /// The name of the credit, e.g. "Car loan".
    pub name: String,
    /// The original principal.
    pub total_amount: f64,
    /// How much is left to pay. Never negative, never above `total_amount`.
    pub remaining_amount: f64,
    /// The annualized interest rate as a percentage. Informational only; it
    /// plays no part in payoff math.
    pub interest_rate: f64,
    /// The nominal size of one installment.
    pub monthly_payment: f64,
    /// When the credit started.
    pub start_date: Date,
    /// When the credit is expected to be fully paid.
    pub end_date: Date,
    /// The due date of the next unsettled installment.
    pub next_payment_date: Date,
    /// How often installments come due.
    pub frequency: PaymentFrequency,
    /// Where the credit is in its life.
    pub status: CreditStatus,
    /// Free-form notes about the credit.
    pub notes: String,
    /// When the credit was recorded.
    pub created_at: OffsetDateTime,
}

/// The slice of a credit that changes when a payment settles.
///
/// Returned alongside settlement results so clients can refresh their view
/// of the credit without another round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSnapshot {
    /// How much is left to pay after the settlement.
    pub remaining_amount: f64,
    /// The due date of the next unsettled installment.
    pub next_payment_date: Date,
    /// Where the credit is in its life after the settlement.
    pub status: CreditStatus,
}

/// The request body for creating a credit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditForm {
    /// The name of the credit.
    pub name: String,
    /// The original principal.
    pub total_amount: f64,
    /// How much is left to pay. Defaults to the full principal.
    #[serde(default)]
    pub remaining_amount: Option<f64>,
    /// The annualized interest rate as a percentage.
    #[serde(default)]
    pub interest_rate: f64,
    /// The nominal size of one installment.
    pub monthly_payment: f64,
    /// When the credit started.
    pub start_date: Date,
    /// When the credit is expected to be fully paid.
    pub end_date: Date,
    /// The due date of the first installment. Defaults to the start date.
    #[serde(default)]
    pub next_payment_date: Option<Date>,
    /// How often installments come due.
    pub frequency: PaymentFrequency,
    /// Free-form notes about the credit.
    #[serde(default)]
    pub notes: String,
}

/// The request body for editing a credit. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditUpdate {
    /// The new name.
    pub name: Option<String>,
    /// The new principal.
    pub total_amount: Option<f64>,
    /// The new remaining balance, clamped into [0, total].
    pub remaining_amount: Option<f64>,
    /// The new interest rate.
    pub interest_rate: Option<f64>,
    /// The new installment size.
    pub monthly_payment: Option<f64>,
    /// The new start date.
    pub start_date: Option<Date>,
    /// The new expected payoff date.
    pub end_date: Option<Date>,
    /// The new next due date.
    pub next_payment_date: Option<Date>,
    /// The new payment frequency.
    pub frequency: Option<PaymentFrequency>,
    /// The new status.
    pub status: Option<CreditStatus>,
    /// The new notes.
    pub notes: Option<String>,
}

impl CreditUpdate {
    /// Whether the update touches any of the fields that are frozen once a
    /// credit is paid off.
    fn touches_financial_fields(&self) -> bool {
        self.total_amount.is_some()
            || self.remaining_amount.is_some()
            || self.interest_rate.is_some()
            || self.monthly_payment.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.next_payment_date.is_some()
            || self.frequency.is_some()
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a credit along with its first scheduled installment.
///
/// The credit starts active with a remaining balance equal to the principal
/// (unless an explicit override is given), and a pending payment for one
/// installment is scheduled on the first due date. Both rows are inserted in
/// one SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::NonPositiveAmount] if the principal or installment size is zero
///   or negative,
/// - [Error::NegativeInterestRate] if the interest rate is negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_credit(form: &CreditForm, connection: &Connection) -> Result<Credit, Error> {
    let name = form.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName("credit name"));
    }

    if form.total_amount <= 0.0 {
        return Err(Error::NonPositiveAmount {
            field: "total amount",
            value: form.total_amount,
        });
    }

    if form.monthly_payment <= 0.0 {
        return Err(Error::NonPositiveAmount {
            field: "monthly payment",
            value: form.monthly_payment,
        });
    }

    if form.interest_rate < 0.0 {
        return Err(Error::NegativeInterestRate(form.interest_rate));
    }

    let remaining_amount = form
        .remaining_amount
        .unwrap_or(form.total_amount)
        .clamp(0.0, form.total_amount);
    let next_payment_date = form.next_payment_date.unwrap_or(form.start_date);
    let created_at = OffsetDateTime::now_utc();

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    transaction.execute(
        "INSERT INTO credit
         (name, total_amount, remaining_amount, interest_rate, monthly_payment, start_date, end_date, next_payment_date, frequency, status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            name,
            form.total_amount,
            remaining_amount,
            form.interest_rate,
            form.monthly_payment,
            form.start_date,
            form.end_date,
            next_payment_date,
            form.frequency.as_str(),
            CreditStatus::Active.as_str(),
            form.notes,
            created_at,
        ],
    )?;

    let id = transaction.last_insert_rowid();

    transaction.execute(
        "INSERT INTO credit_payment (credit_id, amount, date, status, notes, created_at)
         VALUES (?1, ?2, ?3, 'pending', 'First scheduled payment', ?4)",
        params![id, form.monthly_payment, next_payment_date, created_at],
    )?;

    transaction.commit()?;

    Ok(Credit {
        id,
        name: name.to_owned(),
        total_amount: form.total_amount,
        remaining_amount,
        interest_rate: form.interest_rate,
        monthly_payment: form.monthly_payment,
        start_date: form.start_date,
        end_date: form.end_date,
        next_payment_date,
        frequency: form.frequency,
        status: CreditStatus::Active,
        notes: form.notes.clone(),
        created_at,
    })
}

/// Retrieve a credit from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid credit,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_credit(id: CreditId, connection: &Connection) -> Result<Credit, Error> {
    let credit = connection
        .prepare(
            "SELECT id, name, total_amount, remaining_amount, interest_rate, monthly_payment, start_date, end_date, next_payment_date, frequency, status, notes, created_at
             FROM credit WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row_to_credit)?;

    Ok(credit)
}

/// Retrieve all credits, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_credits(connection: &Connection) -> Result<Vec<Credit>, Error> {
    connection
        .prepare(
            "SELECT id, name, total_amount, remaining_amount, interest_rate, monthly_payment, start_date, end_date, next_payment_date, frequency, status, notes, created_at
             FROM credit ORDER BY created_at DESC, id DESC",
        )?
        .query_map([], map_row_to_credit)?
        .map(|maybe_credit| maybe_credit.map_err(|error| error.into()))
        .collect()
}

/// Merge `update` into the stored credit and return the updated row.
///
/// Once a credit is paid off its financial fields are frozen: editing any
/// amount, rate, date, or the frequency of a paid credit is a conflict. The
/// remaining balance is clamped into [0, total] using whichever principal is
/// in effect after the edit.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid credit,
/// - [Error::EditPaidCredit] if the credit is paid and a financial field is
///   present,
/// - [Error::EmptyName], [Error::NonPositiveAmount], or
///   [Error::NegativeInterestRate] if a provided value is invalid,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_credit(
    id: CreditId,
    update: CreditUpdate,
    connection: &Connection,
) -> Result<Credit, Error> {
    let current = get_credit(id, connection)?;

    if current.status == CreditStatus::Paid && update.touches_financial_fields() {
        return Err(Error::EditPaidCredit(id));
    }

    let name = match update.name {
        Some(name) => {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(Error::EmptyName("credit name"));
            }
            name
        }
        None => current.name,
    };

    if let Some(total_amount) = update.total_amount {
        if total_amount <= 0.0 {
            return Err(Error::NonPositiveAmount {
                field: "total amount",
                value: total_amount,
            });
        }
    }

    if let Some(monthly_payment) = update.monthly_payment {
        if monthly_payment <= 0.0 {
            return Err(Error::NonPositiveAmount {
                field: "monthly payment",
                value: monthly_payment,
            });
        }
    }

    if let Some(interest_rate) = update.interest_rate {
        if interest_rate < 0.0 {
            return Err(Error::NegativeInterestRate(interest_rate));
        }
    }

    let total_amount = update.total_amount.unwrap_or(current.total_amount);
    let remaining_amount = update
        .remaining_amount
        .unwrap_or(current.remaining_amount)
        .clamp(0.0, total_amount);

    let credit = Credit {
        id,
        name,
        total_amount,
        remaining_amount,
        interest_rate: update.interest_rate.unwrap_or(current.interest_rate),
        monthly_payment: update.monthly_payment.unwrap_or(current.monthly_payment),
        start_date: update.start_date.unwrap_or(current.start_date),
        end_date: update.end_date.unwrap_or(current.end_date),
        next_payment_date: update.next_payment_date.unwrap_or(current.next_payment_date),
        frequency: update.frequency.unwrap_or(current.frequency),
        status: update.status.unwrap_or(current.status),
        notes: update.notes.unwrap_or(current.notes),
        created_at: current.created_at,
    };

    connection.execute(
        "UPDATE credit
         SET name = ?1, total_amount = ?2, remaining_amount = ?3, interest_rate = ?4,
             monthly_payment = ?5, start_date = ?6, end_date = ?7, next_payment_date = ?8,
             frequency = ?9, status = ?10, notes = ?11
         WHERE id = ?12",
        params![
            credit.name,
            credit.total_amount,
            credit.remaining_amount,
            credit.interest_rate,
            credit.monthly_payment,
            credit.start_date,
            credit.end_date,
            credit.next_payment_date,
            credit.frequency.as_str(),
            credit.status.as_str(),
            credit.notes,
            id,
        ],
    )?;

    Ok(credit)
}

/// Delete a credit and its unsettled payments.
///
/// A credit with settled payments in its history cannot be deleted; the
/// settled rows and their ledger transactions are the audit trail. Pending
/// and overdue payments are removed by the cascade.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid credit,
/// - [Error::DeleteCreditWithHistory] if any owned payment is settled,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_credit(id: CreditId, connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    get_credit(id, &transaction)?;

    let paid_payments: i64 = transaction.query_row(
        "SELECT COUNT(*) FROM credit_payment WHERE credit_id = ?1 AND status = 'paid'",
        [id],
        |row| row.get(0),
    )?;

    if paid_payments > 0 {
        return Err(Error::DeleteCreditWithHistory(id));
    }

    transaction.execute("DELETE FROM credit WHERE id = ?1", [id])?;

    transaction.commit()?;

    Ok(())
}

/// Create the credit and credit payment tables in the database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_credit_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS credit (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            total_amount REAL NOT NULL,
            remaining_amount REAL NOT NULL,
            interest_rate REAL NOT NULL,
            monthly_payment REAL NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            next_payment_date TEXT NOT NULL,
            frequency TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS credit_payment (
            id INTEGER PRIMARY KEY,
            credit_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(credit_id) REFERENCES credit(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_credit_payment_credit ON credit_payment(credit_id, status, date);",
    )?;

    Ok(())
}

/// Map a database row to a [Credit].
pub fn map_row_to_credit(row: &Row) -> Result<Credit, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let total_amount = row.get(2)?;
    let remaining_amount = row.get(3)?;
    let interest_rate = row.get(4)?;
    let monthly_payment = row.get(5)?;
    let start_date = row.get(6)?;
    let end_date = row.get(7)?;
    let next_payment_date = row.get(8)?;

    let raw_frequency: String = row.get(9)?;
    let frequency = PaymentFrequency::parse_or_monthly(&raw_frequency);

    let raw_status: String = row.get(10)?;
    let status = CreditStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            rusqlite::types::Type::Text,
            format!("unknown credit status \"{raw_status}\"").into(),
        )
    })?;

    let notes = row.get(11)?;
    let created_at = row.get(12)?;

    Ok(Credit {
        id,
        name,
        total_amount,
        remaining_amount,
        interest_rate,
        monthly_payment,
        start_date,
        end_date,
        next_payment_date,
        frequency,
        status,
        notes,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================




#[cfg(test)]
mod delete_credit_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        credit::{
            payment::list_payments,
            settle::{SettleForm, settle_payment},
        },
        db::initialize,
        transaction::test_utils::insert_registry_rows,
    };

    use super::{delete_credit, get_credit, test_utils::car_loan};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn delete_cascades_to_pending_payments() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);

        let result = delete_credit(credit.id, &conn);

        assert_eq!(result, Ok(()));
        assert_eq!(get_credit(credit.id, &conn), Err(Error::NotFound));

        let payments = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
        assert!(payments.is_empty());
    }

    #[test]
    fn delete_fails_once_a_payment_has_settled() {
        let conn = get_test_connection();
        let (account_id, category_id) = insert_registry_rows(&conn);
        let credit = car_loan(&conn);
        let payments = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
        settle_payment(
            payments[0].id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        )
        .expect("Could not settle payment");

        let result = delete_credit(credit.id, &conn);

        assert_eq!(result, Err(Error::DeleteCreditWithHistory(credit.id)));
        assert!(get_credit(credit.id, &conn).is_ok());
    }

    #[test]
    fn delete_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = delete_credit(999_999, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
