//! Defines the endpoint for listing credit payments.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{AppState, Error, credit::payment::list_payments, database_id::CreditId};

/// The state needed to list credit payments.
#[derive(Debug, Clone)]
pub struct ListPaymentState {
    /// The database connection for managing credit payments.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListPaymentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string for listing credit payments.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    /// Restrict the listing to one credit.
    pub credit_id: Option<CreditId>,
}

/// A route handler for listing credit payments, optionally restricted to one
/// credit.
///
/// Pending installments whose due date has passed are presented as overdue;
/// the stored rows are untouched.
pub async fn list_credit_payment_endpoint(
    State(state): State<ListPaymentState>,
    Query(query): Query<PaymentQuery>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let today = OffsetDateTime::now_utc().date();

    match list_payments(query.credit_id, today, &connection) {
        Ok(payments) => Json(payments).into_response(),
        Err(error) => error.into_response(),
    }
}
