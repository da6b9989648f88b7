//! Defines the endpoint for creating a new category.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, category::CategoryForm, category::db::create_category};

/// The state needed to create a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new category.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Json(form): Json<CategoryForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_category(&form, &connection) {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::{
        category::{CategoryForm, CategoryType},
        db::initialize,
    };

    use super::{CreateCategoryState, create_category_endpoint};

    #[tokio::test]
    async fn endpoint_returns_created_category() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let state = CreateCategoryState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = create_category_endpoint(
            State(state),
            Json(CategoryForm {
                name: "Rent".to_owned(),
                kind: CategoryType::Expense,
                icon: "🏠".to_owned(),
                color: "#60a5fa".to_owned(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
