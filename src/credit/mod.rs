//! Installment credits and their payment schedules.
//!
//! A credit is a loan paid off in scheduled installments. Each settlement
//! flows through the settlement engine, which is the only writer of a
//! credit's remaining balance, next due date, and status: it marks the
//! installment paid, appends the matching ledger transaction, applies the
//! balance decrement and due-date rollover, flips the credit to paid at zero
//! balance, and schedules the next pending installment.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod pay_endpoint;
mod payment;
mod payment_create_endpoint;
mod payment_delete_endpoint;
mod payment_edit_endpoint;
mod payment_list_endpoint;
mod rollover;
mod settle;

pub use core::{
    Credit, CreditForm, CreditSnapshot, CreditStatus, CreditUpdate, PaymentFrequency,
    create_credit, create_credit_tables, delete_credit, get_credit, list_credits, update_credit,
};
pub use create_endpoint::create_credit_endpoint;
pub use delete_endpoint::delete_credit_endpoint;
pub use edit_endpoint::edit_credit_endpoint;
pub use list_endpoint::list_credit_endpoint;
pub use pay_endpoint::pay_credit_payment_endpoint;
pub use payment::{
    CreditPayment, NewPayment, PaymentStatus, PaymentUpdate, PaymentWithCredit, create_payment,
    delete_payment, get_payment, list_payments, update_payment_metadata,
};
pub use payment_create_endpoint::create_credit_payment_endpoint;
pub use payment_delete_endpoint::delete_credit_payment_endpoint;
pub use payment_edit_endpoint::edit_credit_payment_endpoint;
pub use payment_list_endpoint::{PaymentQuery, list_credit_payment_endpoint};
pub use rollover::next_due_date;
pub use settle::{SettleForm, Settlement, settle_payment};
