//! Defines the endpoint for listing budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, budget::core::list_budgets};

/// The state needed to list budgets.
#[derive(Debug, Clone)]
pub struct ListBudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string for listing budgets.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetQuery {
    /// Restrict the listing to one month (YYYY-MM).
    pub month: Option<String>,
}

/// A route handler for listing budgets, optionally restricted to one month.
pub async fn list_budget_endpoint(
    State(state): State<ListBudgetState>,
    Query(query): Query<BudgetQuery>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match list_budgets(query.month.as_deref(), &connection) {
        Ok(budgets) => Json(budgets).into_response(),
        Err(error) => error.into_response(),
    }
}
