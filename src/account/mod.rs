//! Accounts: where money lives (cash, bank accounts, cards).
//!
//! The credit settlement engine uses this module as a read-only registry to
//! validate that the account a payment is charged against actually exists.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use core::{
    Account, AccountType, account_exists, create_account_table, get_account, map_row_to_account,
};
pub use create_endpoint::{AccountForm, create_account, create_account_endpoint};
pub use delete_endpoint::delete_account_endpoint;
pub use edit_endpoint::edit_account_endpoint;
pub use list_endpoint::{list_account_endpoint, list_accounts};
