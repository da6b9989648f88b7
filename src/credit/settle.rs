//! The payment execution engine: settling a scheduled installment.
//!
//! Settling is the one multi-table transition in the system. In a single SQL
//! transaction it marks the installment paid, appends the matching expense
//! to the ledger, decrements the credit's remaining balance, rolls the next
//! due date forward, flips the credit to paid at zero balance, and schedules
//! the next pending installment. Either every effect lands or none do.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::account_exists,
    category::category_exists,
    credit::{
        core::{Credit, CreditSnapshot, CreditStatus, get_credit},
        payment::{CreditPayment, PaymentStatus, get_payment},
        rollover::next_due_date,
    },
    database_id::{AccountId, CategoryId, CreditId, PaymentId, TransactionId},
    transaction::{NewTransaction, PaymentMethod, TransactionStatus, TransactionType,
        append_transaction},
};

/// The request body for settling a scheduled installment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleForm {
    /// The amount actually paid. May differ from the scheduled amount.
    pub amount: f64,
    /// The settlement date.
    pub date: Date,
    /// The account the payment came out of.
    pub account_id: AccountId,
    /// The ledger category for the payment.
    pub category_id: CategoryId,
    /// How the payment was made.
    pub method: PaymentMethod,
    /// Free-form notes, carried onto both the payment and the ledger entry.
    #[serde(default)]
    pub notes: String,
    /// The ISO 4217 currency code for the ledger entry, defaults to MXN.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// The credit the client believes owns the payment. When supplied, a
    /// mismatch with the stored owner aborts the settlement.
    #[serde(default)]
    pub credit_id: Option<CreditId>,
    /// An override for the ledger entry description. Defaults to
    /// "Payment for: " followed by the credit's name.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form labels for the ledger entry.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_currency() -> String {
    "MXN".to_owned()
}

#[cfg(test)]
impl SettleForm {
    /// A minimal settlement request for tests.
    pub(crate) fn for_test(
        amount: f64,
        date: Date,
        account_id: AccountId,
        category_id: CategoryId,
    ) -> Self {
        Self {
            amount,
            date,
            account_id,
            category_id,
            method: PaymentMethod::Transfer,
            notes: String::new(),
            currency: "MXN".to_owned(),
            credit_id: None,
            description: None,
            tags: Vec::new(),
        }
    }
}

/// Everything a settlement produced.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    /// The installment after settling.
    pub payment: CreditPayment,
    /// The ID of the ledger transaction the settlement appended.
    pub transaction_id: TransactionId,
    /// The owning credit after the settlement.
    pub credit: CreditSnapshot,
}

/// Settle the scheduled installment `payment_id`.
///
/// Preconditions are checked against current stored state inside the same
/// SQL transaction that applies the effects, so a settlement can never act
/// on a stale read: the payment must exist and not already be settled, the
/// client's idea of the owning credit (when supplied) must match, the amount
/// must be positive, and the account and category must exist. On any guard
/// failure nothing is written.
///
/// Two concurrent settlements of the same payment cannot both succeed: the
/// status check and the status write are one conditional UPDATE inside the
/// transaction, so the second attempt always observes the first and fails
/// with [Error::PaymentAlreadySettled]. There is no reversal operation; the
/// ledger only moves forward.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the payment does not exist,
/// - [Error::PaymentAlreadySettled] if the payment is already settled,
/// - [Error::CreditMismatch] if the supplied credit ID does not match,
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::InvalidAccount] or [Error::InvalidCategory] if the referenced
///   registry rows do not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn settle_payment(
    payment_id: PaymentId,
    form: &SettleForm,
    connection: &Connection,
) -> Result<Settlement, Error> {
    if form.amount <= 0.0 {
        return Err(Error::NonPositiveAmount {
            field: "amount",
            value: form.amount,
        });
    }

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let payment = get_payment(payment_id, &transaction)?;

    if payment.status == PaymentStatus::Paid {
        return Err(Error::PaymentAlreadySettled(payment_id));
    }

    if let Some(expected) = form.credit_id {
        if expected != payment.credit_id {
            return Err(Error::CreditMismatch {
                payment_id,
                expected,
                actual: payment.credit_id,
            });
        }
    }

    if !account_exists(form.account_id, &transaction)? {
        return Err(Error::InvalidAccount(form.account_id));
    }

    if !category_exists(form.category_id, &transaction)? {
        return Err(Error::InvalidCategory(form.category_id));
    }

    let credit = get_credit(payment.credit_id, &transaction)?;

    // The status guard is part of the UPDATE itself, so check-and-set is one
    // indivisible statement.
    let rows_affected = transaction.execute(
        "UPDATE credit_payment
         SET status = 'paid', amount = ?1, date = ?2, notes = ?3
         WHERE id = ?4 AND status <> 'paid'",
        params![form.amount, form.date, form.notes, payment_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::PaymentAlreadySettled(payment_id));
    }

    let description = match &form.description {
        Some(description) => description.clone(),
        None => format!("Payment for: {}", credit.name),
    };

    let ledger_entry = append_transaction(
        NewTransaction {
            date: form.date,
            kind: TransactionType::Expense,
            amount: form.amount,
            currency: form.currency.clone(),
            category_id: form.category_id,
            account_id: form.account_id,
            description,
            method: form.method,
            status: TransactionStatus::Confirmed,
            tags: form.tags.clone(),
            source_payment_id: Some(payment_id),
        },
        &transaction,
    )?;

    let credit_snapshot = apply_credit_effects(&credit, form.amount, &transaction)?;

    transaction.commit()?;

    Ok(Settlement {
        payment: CreditPayment {
            amount: form.amount,
            date: form.date,
            status: PaymentStatus::Paid,
            notes: form.notes.clone(),
            ..payment
        },
        transaction_id: ledger_entry.id,
        credit: credit_snapshot,
    })
}

/// Apply the credit-side effects of an installment transitioning to paid.
///
/// Takes the full prior state of the credit and writes the full next state:
/// the remaining balance drops by the settled amount (floored at zero), the
/// next due date rolls forward by the credit's frequency, the status flips
/// to paid when the balance reaches zero, and — while a balance remains — the
/// next pending installment is scheduled unless one already exists on the
/// rolled-over date. Every paid transition in the system funnels through
/// here, so the credit cannot observe which path settled the installment.
///
/// Must be called inside an open SQL transaction; this function performs no
/// commit or rollback of its own.
pub(crate) fn apply_credit_effects(
    credit: &Credit,
    amount: f64,
    connection: &Connection,
) -> Result<CreditSnapshot, Error> {
    let remaining_amount = (credit.remaining_amount - amount).max(0.0);
    let next_payment_date = next_due_date(credit.next_payment_date, credit.frequency);
    let status = if remaining_amount == 0.0 {
        CreditStatus::Paid
    } else {
        credit.status
    };

    connection.execute(
        "UPDATE credit SET remaining_amount = ?1, next_payment_date = ?2, status = ?3 WHERE id = ?4",
        params![remaining_amount, next_payment_date, status.as_str(), credit.id],
    )?;

    if remaining_amount > 0.0 && status != CreditStatus::Paid {
        let already_scheduled: bool = connection.query_row(
            "SELECT EXISTS (
                SELECT 1 FROM credit_payment
                WHERE credit_id = ?1 AND status = 'pending' AND date = ?2
            )",
            params![credit.id, next_payment_date],
            |row| row.get(0),
        )?;

        if !already_scheduled {
            connection.execute(
                "INSERT INTO credit_payment (credit_id, amount, date, status, notes, created_at)
                 VALUES (?1, ?2, ?3, 'pending', '', ?4)",
                params![
                    credit.id,
                    credit.monthly_payment,
                    next_payment_date,
                    OffsetDateTime::now_utc()
                ],
            )?;
        }
    }

    Ok(CreditSnapshot {
        remaining_amount,
        next_payment_date,
        status,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod settle_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        credit::{
            core::{CreditStatus, CreditUpdate, get_credit, test_utils::car_loan, update_credit},
            payment::{PaymentStatus, get_payment, list_payments},
        },
        database_id::{AccountId, CategoryId, PaymentId},
        db::initialize,
        transaction::{
            TransactionType, count_transactions, get_transaction,
            test_utils::insert_registry_rows,
        },
    };

    use super::{SettleForm, settle_payment};

    fn get_test_connection() -> (Connection, AccountId, CategoryId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let (account_id, category_id) = insert_registry_rows(&conn);
        (conn, account_id, category_id)
    }

    fn first_payment_id(credit_id: i64, conn: &Connection) -> PaymentId {
        list_payments(Some(credit_id), date!(2024 - 06 - 25), conn).unwrap()[0].id
    }

    #[test]
    fn settlement_applies_every_effect() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);

        let settlement = settle_payment(
            payment_id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        )
        .expect("Could not settle payment");

        // The installment is settled with the paid amount and date.
        assert_eq!(settlement.payment.id, payment_id);
        assert_eq!(settlement.payment.status, PaymentStatus::Paid);
        assert_eq!(settlement.payment.amount, 2_500.0);
        assert_eq!(
            get_payment(payment_id, &conn).unwrap().status,
            PaymentStatus::Paid
        );

        // The ledger got exactly one confirmed expense linked to the payment.
        let ledger_entry = get_transaction(settlement.transaction_id, &conn).unwrap();
        assert_eq!(ledger_entry.kind, TransactionType::Expense);
        assert_eq!(ledger_entry.amount, 2_500.0);
        assert_eq!(ledger_entry.description, "Payment for: Car loan");
        assert_eq!(ledger_entry.source_payment_id, Some(payment_id));
        assert_eq!(count_transactions(&conn), Ok(1));

        // The credit's balance dropped, its due date rolled forward, and it
        // stayed active.
        assert_eq!(settlement.credit.remaining_amount, 6_000.0);
        assert_eq!(settlement.credit.next_payment_date, date!(2024 - 07 - 25));
        assert_eq!(settlement.credit.status, CreditStatus::Active);

        // Exactly one new pending installment was scheduled on the new date.
        let payments = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].date, date!(2024 - 07 - 25));
        assert_eq!(payments[0].amount, 2_500.0);
        assert_eq!(payments[0].status, PaymentStatus::Pending);
    }

    #[test]
    fn settling_twice_fails_and_changes_nothing() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);
        settle_payment(
            payment_id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        )
        .unwrap();

        let second = settle_payment(
            payment_id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 26), account_id, category_id),
            &conn,
        );

        assert_eq!(second, Err(Error::PaymentAlreadySettled(payment_id)));
        // No second ledger entry, no second balance decrement.
        assert_eq!(count_transactions(&conn), Ok(1));
        assert_eq!(
            get_credit(credit.id, &conn).unwrap().remaining_amount,
            6_000.0
        );
    }

    #[test]
    fn payoff_flips_credit_to_paid_and_stops_scheduling() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        update_credit(
            credit.id,
            CreditUpdate {
                remaining_amount: Some(2_500.0),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        let payment_id = first_payment_id(credit.id, &conn);

        let settlement = settle_payment(
            payment_id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        )
        .unwrap();

        assert_eq!(settlement.credit.remaining_amount, 0.0);
        assert_eq!(settlement.credit.status, CreditStatus::Paid);

        let stored = get_credit(credit.id, &conn).unwrap();
        assert_eq!(stored.status, CreditStatus::Paid);
        assert_eq!(stored.remaining_amount, 0.0);

        // No successor installment for a paid-off credit.
        let payments = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
        assert_eq!(payments.len(), 1);
    }

    #[test]
    fn overpayment_floors_the_balance_at_zero() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);

        let settlement = settle_payment(
            payment_id,
            &SettleForm::for_test(10_000.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        )
        .unwrap();

        assert_eq!(settlement.credit.remaining_amount, 0.0);
        assert_eq!(settlement.credit.status, CreditStatus::Paid);
    }

    #[test]
    fn balance_never_increases_across_settlements() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);

        let mut previous_remaining = credit.remaining_amount;
        for _ in 0..4 {
            let payments =
                list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
            let pending = payments
                .iter()
                .find(|payment| payment.status == PaymentStatus::Pending)
                .expect("expected a pending installment");

            let settlement = settle_payment(
                pending.id,
                &SettleForm::for_test(2_500.0, pending.date, account_id, category_id),
                &conn,
            )
            .unwrap();

            assert!(settlement.credit.remaining_amount <= previous_remaining);
            assert!(settlement.credit.remaining_amount >= 0.0);
            previous_remaining = settlement.credit.remaining_amount;
        }

        assert_eq!(previous_remaining, 0.0);
        assert_eq!(
            get_credit(credit.id, &conn).unwrap().status,
            CreditStatus::Paid
        );
    }

    #[test]
    fn no_duplicate_installment_for_an_already_scheduled_date() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);

        // A pending installment already sits on the rolled-over date.
        crate::credit::payment::create_payment(
            &crate::credit::payment::NewPayment {
                credit_id: credit.id,
                amount: 2_500.0,
                date: date!(2024 - 07 - 25),
                status: PaymentStatus::Pending,
                notes: String::new(),
            },
            &conn,
        )
        .unwrap();

        settle_payment(
            payment_id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        )
        .unwrap();

        let on_due_date: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM credit_payment
                 WHERE credit_id = ?1 AND status = 'pending' AND date = ?2",
                rusqlite::params![credit.id, date!(2024 - 07 - 25)],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(on_due_date, 1);
    }

    #[test]
    fn missing_payment_returns_not_found() {
        let (conn, account_id, category_id) = get_test_connection();

        let result = settle_payment(
            999_999,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn credit_mismatch_aborts_with_no_effect() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);

        let mut form =
            SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id);
        form.credit_id = Some(credit.id + 1);

        let result = settle_payment(payment_id, &form, &conn);

        assert_eq!(
            result,
            Err(Error::CreditMismatch {
                payment_id,
                expected: credit.id + 1,
                actual: credit.id,
            })
        );
        assert_eq!(count_transactions(&conn), Ok(0));
        assert_eq!(
            get_payment(payment_id, &conn).unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[test]
    fn invalid_registry_references_abort_with_no_effect() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);

        let bad_account = settle_payment(
            payment_id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id + 99, category_id),
            &conn,
        );
        assert_eq!(bad_account, Err(Error::InvalidAccount(account_id + 99)));

        let bad_category = settle_payment(
            payment_id,
            &SettleForm::for_test(2_500.0, date!(2024 - 06 - 25), account_id, category_id + 99),
            &conn,
        );
        assert_eq!(bad_category, Err(Error::InvalidCategory(category_id + 99)));

        // Nothing was written by either attempt.
        assert_eq!(count_transactions(&conn), Ok(0));
        assert_eq!(
            get_payment(payment_id, &conn).unwrap().status,
            PaymentStatus::Pending
        );
        assert_eq!(
            get_credit(credit.id, &conn).unwrap().remaining_amount,
            8_500.0
        );
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);

        let result = settle_payment(
            payment_id,
            &SettleForm::for_test(0.0, date!(2024 - 06 - 25), account_id, category_id),
            &conn,
        );

        assert_eq!(
            result,
            Err(Error::NonPositiveAmount {
                field: "amount",
                value: 0.0
            })
        );
    }

    #[test]
    fn settlement_amount_can_differ_from_scheduled_amount() {
        let (conn, account_id, category_id) = get_test_connection();
        let credit = car_loan(&conn);
        let payment_id = first_payment_id(credit.id, &conn);

        let settlement = settle_payment(
            payment_id,
            &SettleForm::for_test(3_000.0, date!(2024 - 06 - 27), account_id, category_id),
            &conn,
        )
        .unwrap();

        assert_eq!(settlement.payment.amount, 3_000.0);
        assert_eq!(settlement.payment.date, date!(2024 - 06 - 27));
        assert_eq!(settlement.credit.remaining_amount, 5_500.0);

        // The successor installment still uses the nominal size.
        let payments = list_payments(Some(credit.id), date!(2024 - 06 - 25), &conn).unwrap();
        assert_eq!(payments[0].amount, 2_500.0);
    }
}

#[cfg(test)]
mod weekly_schedule_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        credit::{
            core::{CreditForm, PaymentFrequency, create_credit},
            payment::list_payments,
        },
        db::initialize,
        transaction::test_utils::insert_registry_rows,
    };

    use super::{SettleForm, settle_payment};

    #[test]
    fn weekly_credit_rolls_seven_days() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let (account_id, category_id) = insert_registry_rows(&conn);

        let credit = create_credit(
            &CreditForm {
                name: "Appliance plan".to_owned(),
                total_amount: 1_200.0,
                remaining_amount: None,
                interest_rate: 0.0,
                monthly_payment: 100.0,
                start_date: date!(2024 - 06 - 03),
                end_date: date!(2024 - 09 - 02),
                next_payment_date: None,
                frequency: PaymentFrequency::Weekly,
                notes: String::new(),
            },
            &conn,
        )
        .unwrap();
        let payment_id = list_payments(Some(credit.id), date!(2024 - 06 - 03), &conn).unwrap()[0].id;

        let settlement = settle_payment(
            payment_id,
            &SettleForm::for_test(100.0, date!(2024 - 06 - 03), account_id, category_id),
            &conn,
        )
        .unwrap();

        assert_eq!(settlement.credit.next_payment_date, date!(2024 - 06 - 10));
    }
}
