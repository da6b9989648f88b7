//! Monthly spending limits per category.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use core::{
    Budget, BudgetForm, BudgetUpdate, create_budget, create_budget_table, delete_budget,
    get_budget, list_budgets, update_budget,
};
pub use create_endpoint::create_budget_endpoint;
pub use delete_endpoint::delete_budget_endpoint;
pub use edit_endpoint::edit_budget_endpoint;
pub use list_endpoint::{BudgetQuery, list_budget_endpoint};
