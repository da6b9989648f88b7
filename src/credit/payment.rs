//! Defines the data model and database queries for scheduled installments.

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    credit::{
        core::{CreditSnapshot, get_credit},
        settle::apply_credit_effects,
    },
    database_id::{CreditId, PaymentId},
};

/// Where an installment is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The installment is scheduled but not yet paid.
    Pending,
    /// The installment has been settled. Terminal: a paid installment never
    /// changes again.
    Paid,
    /// The installment's due date has passed without a settlement.
    ///
    /// Never stored: pending rows whose date has passed are presented as
    /// overdue when payments are read.
    Overdue,
}

impl PaymentStatus {
    /// The lowercase string stored in the database for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }

    /// Parse the stored database representation of a payment status.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "overdue" => Some(PaymentStatus::Overdue),
            _ => None,
        }
    }
}

/// One scheduled or settled installment belonging to a credit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPayment {
    /// The ID of the payment.
    pub id: PaymentId,
    /// The credit the payment belongs to.
    pub credit_id: CreditId,
    /// The scheduled amount, or the settled amount once paid.
    pub amount: f64,
    /// The due date, or the settlement date once paid.
    pub date: Date,
    /// Where the installment is in its life.
    pub status: PaymentStatus,
    /// Free-form notes about the payment.
    pub notes: String,
    /// When the row was recorded.
    pub created_at: OffsetDateTime,
}

/// A payment paired with the owning credit's post-update snapshot.
///
/// The snapshot is present when the operation changed the credit (an
/// installment transitioned to paid) so clients can refresh without another
/// round trip.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWithCredit {
    /// The payment after the operation.
    #[serde(flatten)]
    pub payment: CreditPayment,
    /// The owning credit after the operation, when it changed.
    pub credit: Option<CreditSnapshot>,
}

/// The request body for scheduling an extra installment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    /// The credit the installment belongs to.
    pub credit_id: CreditId,
    /// The installment amount.
    pub amount: f64,
    /// The due date.
    pub date: Date,
    /// The initial status. Defaults to pending; creating a payment directly
    /// as paid applies the credit-side settlement effects.
    #[serde(default = "default_payment_status")]
    pub status: PaymentStatus,
    /// Free-form notes about the payment.
    #[serde(default)]
    pub notes: String,
}

fn default_payment_status() -> PaymentStatus {
    PaymentStatus::Pending
}

/// The request body for editing a payment. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentUpdate {
    /// The new status.
    pub status: Option<PaymentStatus>,
    /// The new notes.
    pub notes: Option<String>,
    /// The new due or settlement date.
    pub date: Option<Date>,
}

/// Retrieve a single payment by ID, as stored.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid payment,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_payment(id: PaymentId, connection: &Connection) -> Result<CreditPayment, Error> {
    let payment = connection
        .prepare(
            "SELECT id, credit_id, amount, date, status, notes, created_at
             FROM credit_payment WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row_to_payment)?;

    Ok(payment)
}

/// Retrieve payments, optionally restricted to one credit, newest due first.
///
/// Stored statuses are projected for presentation: a pending payment whose
/// due date is before `today` is reported as overdue. The projection is never
/// written back.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_payments(
    credit_id: Option<CreditId>,
    today: Date,
    connection: &Connection,
) -> Result<Vec<CreditPayment>, Error> {
    let payments: Result<Vec<CreditPayment>, Error> = if let Some(credit_id) = credit_id {
        connection
            .prepare(
                "SELECT id, credit_id, amount, date, status, notes, created_at
                 FROM credit_payment WHERE credit_id = :credit_id
                 ORDER BY date DESC, created_at DESC",
            )?
            .query_map(&[(":credit_id", &credit_id)], map_row_to_payment)?
            .map(|maybe_payment| maybe_payment.map_err(|error| error.into()))
            .collect()
    } else {
        connection
            .prepare(
                "SELECT id, credit_id, amount, date, status, notes, created_at
                 FROM credit_payment ORDER BY date DESC, created_at DESC",
            )?
            .query_map([], map_row_to_payment)?
            .map(|maybe_payment| maybe_payment.map_err(|error| error.into()))
            .collect()
    };

    Ok(payments?
        .into_iter()
        .map(|payment| CreditPayment {
            status: presented_status(payment.status, payment.date, today),
            ..payment
        })
        .collect())
}

/// The status to present for a stored payment given the current date.
fn presented_status(stored: PaymentStatus, due_date: Date, today: Date) -> PaymentStatus {
    match stored {
        PaymentStatus::Pending if due_date < today => PaymentStatus::Overdue,
        status => status,
    }
}

/// Schedule an extra installment for a credit.
///
/// When the new payment is created directly as paid, the credit-side
/// settlement effects (balance decrement, due-date rollover, status flip,
/// next-installment provisioning) run in the same SQL transaction. Unlike
/// the full settlement operation this path appends no ledger transaction: it
/// has no account or category to charge against.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the credit does not exist,
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::StoredOverdueStatus] if the requested status is overdue,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_payment(
    new_payment: &NewPayment,
    connection: &Connection,
) -> Result<PaymentWithCredit, Error> {
    if new_payment.amount <= 0.0 {
        return Err(Error::NonPositiveAmount {
            field: "amount",
            value: new_payment.amount,
        });
    }

    if new_payment.status == PaymentStatus::Overdue {
        return Err(Error::StoredOverdueStatus);
    }

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let credit = get_credit(new_payment.credit_id, &transaction)?;
    let created_at = OffsetDateTime::now_utc();

    transaction.execute(
        "INSERT INTO credit_payment (credit_id, amount, date, status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new_payment.credit_id,
            new_payment.amount,
            new_payment.date,
            new_payment.status.as_str(),
            new_payment.notes,
            created_at,
        ],
    )?;

    let id = transaction.last_insert_rowid();

    let credit_snapshot = if new_payment.status == PaymentStatus::Paid {
        Some(apply_credit_effects(&credit, new_payment.amount, &transaction)?)
    } else {
        None
    };

    transaction.commit()?;

    Ok(PaymentWithCredit {
        payment: CreditPayment {
            id,
            credit_id: new_payment.credit_id,
            amount: new_payment.amount,
            date: new_payment.date,
            status: new_payment.status,
            notes: new_payment.notes.clone(),
            created_at,
        },
        credit: credit_snapshot,
    })
}

/// Merge `update` into a stored payment.
///
/// A settled payment is immutable: any modification is a conflict, and a
/// requested transition away from paid reports the reversal conflict
/// specifically. A pending payment transitioning into paid through this path
/// applies the credit-side settlement effects in the same SQL transaction,
/// but appends no ledger transaction (it has no account or category to
/// charge against); callers wanting the ledger entry use the pay operation.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid payment,
/// - [Error::PaymentReversalNotSupported] if the payment is settled and a
///   transition to pending or overdue was requested,
/// - [Error::PaymentAlreadySettled] if the payment is settled and any other
///   change was requested,
/// - [Error::StoredOverdueStatus] if the requested status is overdue,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_payment_metadata(
    id: PaymentId,
    update: PaymentUpdate,
    connection: &Connection,
) -> Result<PaymentWithCredit, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let current = get_payment(id, &transaction)?;

    if current.status == PaymentStatus::Paid {
        match update.status {
            Some(status) if status != PaymentStatus::Paid => {
                return Err(Error::PaymentReversalNotSupported);
            }
            Some(_) => return Err(Error::PaymentAlreadySettled(id)),
            None if update.notes.is_some() || update.date.is_some() => {
                return Err(Error::PaymentAlreadySettled(id));
            }
            None => {
                return Ok(PaymentWithCredit {
                    payment: current,
                    credit: None,
                });
            }
        }
    }

    if update.status == Some(PaymentStatus::Overdue) {
        return Err(Error::StoredOverdueStatus);
    }

    let payment = CreditPayment {
        id,
        credit_id: current.credit_id,
        amount: current.amount,
        date: update.date.unwrap_or(current.date),
        status: update.status.unwrap_or(current.status),
        notes: update.notes.unwrap_or(current.notes),
        created_at: current.created_at,
    };

    transaction.execute(
        "UPDATE credit_payment SET status = ?1, notes = ?2, date = ?3 WHERE id = ?4",
        params![payment.status.as_str(), payment.notes, payment.date, id],
    )?;

    let credit_snapshot = if payment.status == PaymentStatus::Paid {
        let credit = get_credit(payment.credit_id, &transaction)?;
        Some(apply_credit_effects(&credit, payment.amount, &transaction)?)
    } else {
        None
    };

    transaction.commit()?;

    Ok(PaymentWithCredit {
        payment,
        credit: credit_snapshot,
    })
}

/// Delete an unsettled payment by ID.
///
/// Settled payments cannot be deleted: they anchor the audit trail tying the
/// ledger transaction to the credit-balance update.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid payment,
/// - [Error::DeletePaidPayment] if the payment is settled,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_payment(id: PaymentId, connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let payment = get_payment(id, &transaction)?;

    if payment.status == PaymentStatus::Paid {
        return Err(Error::DeletePaidPayment(id));
    }

    transaction.execute("DELETE FROM credit_payment WHERE id = ?1", [id])?;

    transaction.commit()?;

    Ok(())
}

/// Map a database row to a [CreditPayment].
pub fn map_row_to_payment(row: &Row) -> Result<CreditPayment, rusqlite::Error> {
    let id = row.get(0)?;
    let credit_id = row.get(1)?;
    let amount = row.get(2)?;
    let date = row.get(3)?;

    let raw_status: String = row.get(4)?;
    let status = PaymentStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown payment status \"{raw_status}\"").into(),
        )
    })?;

    let notes = row.get(5)?;
    let created_at = row.get(6)?;

    Ok(CreditPayment {
        id,
        credit_id,
        amount,
        date,
        status,
        notes,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod payment_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        credit::{
            core::{CreditStatus, get_credit, test_utils::car_loan},
            payment::PaymentStatus,
        },
        db::initialize,
    };

    use super::{
        NewPayment, PaymentUpdate, create_payment, delete_payment, get_payment, list_payments,
        update_payment_metadata,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn list_presents_past_due_pending_as_overdue() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);

        let on_time = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
        let late = list_payments(Some(credit.id), date!(2024 - 07 - 01), &conn).unwrap();

        assert_eq!(on_time[0].status, PaymentStatus::Pending);
        assert_eq!(late[0].status, PaymentStatus::Overdue);

        // The projection is never written back.
        assert_eq!(
            get_payment(late[0].id, &conn).unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[test]
    fn schedule_extra_pending_payment() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);

        let result = create_payment(
            &NewPayment {
                credit_id: credit.id,
                amount: 1_000.0,
                date: date!(2024 - 07 - 10),
                status: PaymentStatus::Pending,
                notes: "extra payment".to_owned(),
            },
            &conn,
        )
        .expect("Could not schedule payment");

        assert!(result.credit.is_none());
        assert_eq!(
            get_credit(credit.id, &conn).unwrap().remaining_amount,
            credit.remaining_amount
        );
    }

    #[test]
    fn create_paid_payment_applies_credit_effects() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);

        let result = create_payment(
            &NewPayment {
                credit_id: credit.id,
                amount: 1_000.0,
                date: date!(2024 - 06 - 20),
                status: PaymentStatus::Paid,
                notes: String::new(),
            },
            &conn,
        )
        .expect("Could not create paid payment");

        let snapshot = result.credit.expect("expected a credit snapshot");
        assert_eq!(snapshot.remaining_amount, 7_500.0);
        assert_eq!(snapshot.next_payment_date, date!(2024 - 07 - 25));
        assert_eq!(snapshot.status, CreditStatus::Active);
    }

    #[test]
    fn create_payment_rejects_stored_overdue() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);

        let result = create_payment(
            &NewPayment {
                credit_id: credit.id,
                amount: 1_000.0,
                date: date!(2024 - 05 - 01),
                status: PaymentStatus::Overdue,
                notes: String::new(),
            },
            &conn,
        );

        assert!(matches!(result, Err(Error::StoredOverdueStatus)));
    }

    #[test]
    fn create_payment_rejects_missing_credit() {
        let conn = get_test_connection();

        let result = create_payment(
            &NewPayment {
                credit_id: 999_999,
                amount: 1_000.0,
                date: date!(2024 - 06 - 20),
                status: PaymentStatus::Pending,
                notes: String::new(),
            },
            &conn,
        );

        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn metadata_paid_transition_applies_credit_effects_without_ledger_entry() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap()[0].id;

        let result = update_payment_metadata(
            payment_id,
            PaymentUpdate {
                status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
            &conn,
        )
        .expect("Could not update payment");

        assert_eq!(result.payment.status, PaymentStatus::Paid);
        let snapshot = result.credit.expect("expected a credit snapshot");
        assert_eq!(snapshot.remaining_amount, 6_000.0);
        assert_eq!(snapshot.next_payment_date, date!(2024 - 07 - 25));

        // This path charges no account, so the ledger stays empty.
        let ledger_rows = crate::transaction::count_transactions(&conn).unwrap();
        assert_eq!(ledger_rows, 0);

        // The next installment is still provisioned.
        let payments = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].date, date!(2024 - 07 - 25));
        assert_eq!(payments[0].status, PaymentStatus::Pending);
    }

    #[test]
    fn settled_payments_are_immutable() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap()[0].id;
        update_payment_metadata(
            payment_id,
            PaymentUpdate {
                status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        let settled = get_payment(payment_id, &conn).unwrap();

        let reversal = update_payment_metadata(
            payment_id,
            PaymentUpdate {
                status: Some(PaymentStatus::Pending),
                ..Default::default()
            },
            &conn,
        );
        assert!(matches!(reversal, Err(Error::PaymentReversalNotSupported)));

        let edit = update_payment_metadata(
            payment_id,
            PaymentUpdate {
                notes: Some("retouched".to_owned()),
                ..Default::default()
            },
            &conn,
        );
        assert!(matches!(edit, Err(Error::PaymentAlreadySettled(_))));

        let re_settle = update_payment_metadata(
            payment_id,
            PaymentUpdate {
                status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
            &conn,
        );
        assert!(matches!(re_settle, Err(Error::PaymentAlreadySettled(_))));

        assert_eq!(get_payment(payment_id, &conn), Ok(settled));
    }

    #[test]
    fn pending_payment_metadata_edit_leaves_credit_untouched() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap()[0].id;

        let result = update_payment_metadata(
            payment_id,
            PaymentUpdate {
                notes: Some("due next week".to_owned()),
                date: Some(date!(2024 - 07 - 02)),
                ..Default::default()
            },
            &conn,
        )
        .expect("Could not update payment");

        assert!(result.credit.is_none());
        assert_eq!(result.payment.notes, "due next week");
        assert_eq!(result.payment.date, date!(2024 - 07 - 02));
        assert_eq!(
            get_credit(credit.id, &conn).unwrap().remaining_amount,
            credit.remaining_amount
        );
    }

    #[test]
    fn delete_pending_payment_succeeds() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap()[0].id;

        let result = delete_payment(payment_id, &conn);

        assert_eq!(result, Ok(()));
        assert_eq!(get_payment(payment_id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_settled_payment_fails() {
        let conn = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap()[0].id;
        update_payment_metadata(
            payment_id,
            PaymentUpdate {
                status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        let result = delete_payment(payment_id, &conn);

        assert_eq!(result, Err(Error::DeletePaidPayment(payment_id)));
        assert!(get_payment(payment_id, &conn).is_ok());
    }

    #[test]
    fn delete_missing_payment_returns_not_found() {
        let conn = get_test_connection();

        let result = delete_payment(999_999, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
