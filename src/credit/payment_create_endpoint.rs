//! Defines the endpoint for scheduling an extra credit payment.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    credit::payment::{NewPayment, create_payment},
};

/// The state needed to schedule a credit payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentState {
    /// The database connection for managing credit payments.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreatePaymentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for scheduling an extra installment on a credit.
///
/// A payment created directly as paid applies the credit-side settlement
/// effects but writes no ledger entry; the pay endpoint is the path that
/// records the expense.
pub async fn create_credit_payment_endpoint(
    State(state): State<CreatePaymentState>,
    Json(new_payment): Json<NewPayment>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_payment(&new_payment, &connection) {
        Ok(payment) => (StatusCode::CREATED, Json(payment)).into_response(),
        Err(error) => error.into_response(),
    }
}
