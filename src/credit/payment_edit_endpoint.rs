//! Defines the endpoint for editing a credit payment.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    credit::payment::{PaymentUpdate, update_payment_metadata},
    database_id::PaymentId,
};

/// The state needed to edit a credit payment.
#[derive(Debug, Clone)]
pub struct EditPaymentState {
    /// The database connection for managing credit payments.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditPaymentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for editing a credit payment's status, notes, or date.
///
/// Settled payments are immutable; attempts to change one are rejected with
/// a conflict, and transitions away from paid are called out as unsupported
/// reversals.
pub async fn edit_credit_payment_endpoint(
    State(state): State<EditPaymentState>,
    Path(payment_id): Path<PaymentId>,
    Json(update): Json<PaymentUpdate>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_payment_metadata(payment_id, update, &connection) {
        Ok(payment) => Json(payment).into_response(),
        Err(error) => error.into_response(),
    }
}
