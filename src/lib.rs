//! Dinero is a personal finance tracker: a JSON REST API for recording
//! income and expense transactions, organizing them by account and category,
//! tracking installment credits with payment schedules, and managing monthly
//! budgets.
//!
//! The interesting part is the credit settlement engine in [credit]: paying
//! a scheduled installment atomically marks the installment paid, appends
//! the matching ledger transaction, decrements the credit's remaining
//! balance, rolls the next due date forward by the credit's payment
//! frequency, flips the credit to paid when the balance reaches zero, and
//! schedules the next pending installment.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

pub mod account;
mod app_state;
pub mod budget;
pub mod category;
pub mod credit;
mod database_id;
pub mod db;
pub mod endpoints;
mod logging;
mod routing;
pub mod transaction;

pub use app_state::AppState;
pub use database_id::{
    AccountId, BudgetId, CategoryId, CreditId, DatabaseId, PaymentId, TransactionId,
};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required name field was blank.
    #[error("{0} cannot be empty")]
    EmptyName(&'static str),

    /// An amount that must be strictly positive was zero or negative.
    #[error("{field} must be greater than zero, got {value}")]
    NonPositiveAmount {
        /// The name of the offending field.
        field: &'static str,
        /// The value the client sent.
        value: f64,
    },

    /// A negative interest rate was supplied for a credit.
    #[error("interest rate cannot be negative, got {0}")]
    NegativeInterestRate(f64),

    /// A budget month string did not match the expected YYYY-MM format.
    #[error("\"{0}\" is not a valid month, expected the format YYYY-MM")]
    InvalidMonth(String),

    /// The account ID used in a request did not match a valid account.
    #[error("the account ID {0} does not refer to a valid account")]
    InvalidAccount(AccountId),

    /// The category ID used in a request did not match a valid category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// A client asked to store the overdue payment status directly.
    ///
    /// Overdue is derived by comparing a pending payment's due date to the
    /// current date when payments are read, so nothing ever needs to sweep
    /// stored rows.
    #[error("overdue is derived from a payment's due date and cannot be stored")]
    StoredOverdueStatus,

    /// A query was given an invalid foreign key.
    #[error("a referenced row does not exist")]
    InvalidForeignKey,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update an account that does not exist
    #[error("tried to update an account that is not in the database")]
    UpdateMissingAccount,

    /// Tried to delete an account that does not exist
    #[error("tried to delete an account that is not in the database")]
    DeleteMissingAccount,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// A settlement was requested for a payment that is already settled.
    ///
    /// This guard is what makes double-submitting a pay request safe: the
    /// second request fails without touching the ledger or the credit.
    #[error("payment {0} has already been settled")]
    PaymentAlreadySettled(PaymentId),

    /// A settled payment was asked to transition back to an unsettled status.
    #[error("a settled payment cannot be reverted to an unsettled status")]
    PaymentReversalNotSupported,

    /// The credit ID supplied by the client does not match the credit that
    /// owns the payment.
    ///
    /// Protects against settling a payment against the wrong credit when the
    /// client holds stale state.
    #[error("payment {payment_id} belongs to credit {actual}, not credit {expected}")]
    CreditMismatch {
        /// The payment the client tried to settle.
        payment_id: PaymentId,
        /// The credit the client thought the payment belonged to.
        expected: CreditId,
        /// The credit that actually owns the payment.
        actual: CreditId,
    },

    /// The amounts, dates, or frequency of a paid-off credit were edited.
    #[error("credit {0} is paid off, its amounts and dates can no longer be edited")]
    EditPaidCredit(CreditId),

    /// A credit with settled payments in its history was asked to be deleted.
    #[error("credit {0} has settled payments and cannot be deleted")]
    DeleteCreditWithHistory(CreditId),

    /// A settled payment was asked to be deleted.
    #[error("payment {0} has been settled and cannot be deleted")]
    DeletePaidPayment(PaymentId),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidForeignKey,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body returned for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match self {
            Error::EmptyName(_)
            | Error::NonPositiveAmount { .. }
            | Error::NegativeInterestRate(_)
            | Error::InvalidMonth(_)
            | Error::InvalidAccount(_)
            | Error::InvalidCategory(_)
            | Error::StoredOverdueStatus
            | Error::InvalidForeignKey => StatusCode::BAD_REQUEST,

            Error::NotFound
            | Error::UpdateMissingAccount
            | Error::DeleteMissingAccount
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::UpdateMissingBudget
            | Error::DeleteMissingBudget => StatusCode::NOT_FOUND,

            Error::PaymentAlreadySettled(_)
            | Error::PaymentReversalNotSupported
            | Error::CreditMismatch { .. }
            | Error::EditPaidCredit(_)
            | Error::DeleteCreditWithHistory(_)
            | Error::DeletePaidPayment(_) => StatusCode::CONFLICT,

            Error::SqlError(_) | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal errors are not intended to be shown to the client.
        let body = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
            ErrorBody {
                error: "An unexpected error occurred, check the server logs for more details."
                    .to_owned(),
            }
        } else {
            ErrorBody {
                error: self.to_string(),
            }
        };

        (status_code, Json(body)).into_response()
    }
}
