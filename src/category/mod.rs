//! Categories for classifying transactions and budgets.
//!
//! Like [crate::account], this module doubles as a read-only registry for the
//! credit settlement engine.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;

pub use create::create_category_endpoint;
pub use db::{
    category_exists, create_category, create_category_table, delete_category, get_category,
    list_categories, update_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryForm, CategoryType, CategoryUpdate};
pub use edit::edit_category_endpoint;
pub use list::list_category_endpoint;
