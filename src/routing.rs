//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    account::{
        create_account_endpoint, delete_account_endpoint, edit_account_endpoint,
        list_account_endpoint,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, edit_budget_endpoint, list_budget_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, edit_category_endpoint,
        list_category_endpoint,
    },
    credit::{
        create_credit_endpoint, create_credit_payment_endpoint, delete_credit_endpoint,
        delete_credit_payment_endpoint, edit_credit_endpoint, edit_credit_payment_endpoint,
        list_credit_endpoint, list_credit_payment_endpoint, pay_credit_payment_endpoint,
    },
    endpoints,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        list_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(
            endpoints::ACCOUNTS,
            get(list_account_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            put(edit_account_endpoint).delete(delete_account_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_category_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(edit_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transaction_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            get(list_budget_endpoint).post(create_budget_endpoint),
        )
        .route(
            endpoints::BUDGET,
            put(edit_budget_endpoint).delete(delete_budget_endpoint),
        )
        .route(
            endpoints::CREDITS,
            get(list_credit_endpoint).post(create_credit_endpoint),
        )
        .route(
            endpoints::CREDIT,
            put(edit_credit_endpoint).delete(delete_credit_endpoint),
        )
        .route(
            endpoints::CREDIT_PAYMENTS,
            get(list_credit_payment_endpoint).post(create_credit_payment_endpoint),
        )
        .route(
            endpoints::CREDIT_PAYMENT,
            put(edit_credit_payment_endpoint).delete(delete_credit_payment_endpoint),
        )
        .route(
            endpoints::PAY_CREDIT_PAYMENT,
            post(pay_credit_payment_endpoint),
        )
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Report that the server is up.
async fn get_health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "the requested resource could not be found" })),
    )
        .into_response()
}
