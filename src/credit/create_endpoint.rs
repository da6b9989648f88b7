//! Defines the endpoint for creating a new credit.

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
    credit::core::{CreditForm, create_credit},
};

/// The state needed to create a credit.
#[derive(Debug, Clone)]
pub struct CreateCreditState {
    /// The database connection for managing credits.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCreditState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new credit along with its first scheduled
/// installment.
pub async fn create_credit_endpoint(
    State(state): State<CreateCreditState>,
    Json(form): Json<CreditForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_credit(&form, &connection) {
        Ok(credit) => (StatusCode::CREATED, Json(credit)).into_response(),
        Err(error) => error.into_response(),
    }
}
