//! Defines the endpoint for settling a scheduled credit payment.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    credit::settle::{SettleForm, settle_payment},
    database_id::PaymentId,
};

/// The state needed to settle a credit payment.
#[derive(Debug, Clone)]
pub struct PayState {
    /// The database connection for managing credits and the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PayState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for settling a scheduled credit payment.
///
/// Settling is all-or-nothing: the installment is marked paid, the expense
/// is appended to the ledger, and the credit's balance, due date, status,
/// and schedule are updated in one transaction. Submitting the same payment
/// twice yields a conflict and no second ledger entry.
pub async fn pay_credit_payment_endpoint(
    State(state): State<PayState>,
    Path(payment_id): Path<PaymentId>,
    Json(form): Json<SettleForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match settle_payment(payment_id, &form, &connection) {
        Ok(settlement) => Json(settlement).into_response(),
        Err(error) => error.into_response(),
    }
}
