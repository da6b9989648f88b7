//! Defines the endpoint for editing a credit.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    credit::core::{CreditUpdate, update_credit},
    database_id::CreditId,
};

/// The state needed to edit a credit.
#[derive(Debug, Clone)]
pub struct EditCreditState {
    /// The database connection for managing credits.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCreditState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for editing a credit.
///
/// Financial fields of a paid-off credit are frozen; edits touching them are
/// rejected with a conflict.
pub async fn edit_credit_endpoint(
    State(state): State<EditCreditState>,
    Path(credit_id): Path<CreditId>,
    Json(update): Json<CreditUpdate>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_credit(credit_id, update, &connection) {
        Ok(credit) => Json(credit).into_response(),
        Err(error) => error.into_response(),
    }
}
