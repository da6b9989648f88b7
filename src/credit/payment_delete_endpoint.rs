//! Defines the endpoint for deleting a credit payment.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{AppState, Error, credit::payment::delete_payment, database_id::PaymentId};

/// The state needed to delete a credit payment.
#[derive(Debug, Clone)]
pub struct DeletePaymentState {
    /// The database connection for managing credit payments.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeletePaymentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting an unsettled credit payment.
pub async fn delete_credit_payment_endpoint(
    State(state): State<DeletePaymentState>,
    Path(payment_id): Path<PaymentId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_payment(payment_id, &connection) {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(error) => {
            tracing::error!("Could not delete payment {payment_id}: {error}");
            error.into_response()
        }
    }
}
