//! Defines the endpoint for editing a budget.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    budget::core::{BudgetUpdate, update_budget},
    database_id::BudgetId,
};

/// The state needed to edit a budget.
#[derive(Debug, Clone)]
pub struct EditBudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for editing a budget.
pub async fn edit_budget_endpoint(
    State(state): State<EditBudgetState>,
    Path(budget_id): Path<BudgetId>,
    Json(update): Json<BudgetUpdate>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_budget(budget_id, update, &connection) {
        Ok(budget) => Json(budget).into_response(),
        Err(error) => error.into_response(),
    }
}
