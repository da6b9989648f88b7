//! Defines the endpoint for deleting a credit.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{AppState, Error, credit::core::delete_credit, database_id::CreditId};

/// The state needed to delete a credit.
#[derive(Debug, Clone)]
pub struct DeleteCreditState {
    /// The database connection for managing credits.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCreditState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a credit and its unsettled installments.
///
/// A credit with settled payments cannot be deleted; the response is a
/// conflict so the client can tell the history is what blocked it.
pub async fn delete_credit_endpoint(
    State(state): State<DeleteCreditState>,
    Path(credit_id): Path<CreditId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_credit(credit_id, &connection) {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(error) => {
            tracing::error!("Could not delete credit {credit_id}: {error}");
            error.into_response()
        }
    }
}
