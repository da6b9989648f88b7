//! Defines the endpoint for listing credits.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, credit::core::list_credits};

/// The state needed to list credits.
#[derive(Debug, Clone)]
pub struct ListCreditState {
    /// The database connection for managing credits.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListCreditState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing all credits, newest first.
pub async fn list_credit_endpoint(State(state): State<ListCreditState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match list_credits(&connection) {
        Ok(credits) => Json(credits).into_response(),
        Err(error) => error.into_response(),
    }
}
