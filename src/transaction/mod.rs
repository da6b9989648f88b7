//! The ledger: an append-friendly record of money movements.
//!
//! Every settled credit payment appends exactly one expense row here through
//! [append_transaction]; ordinary ledger CRUD goes through the endpoints in
//! this module.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod query;

pub use core::{
    NewTransaction, PaymentMethod, Transaction, TransactionStatus, TransactionType,
    append_transaction, count_transactions, create_transaction_table, get_transaction,
    map_transaction_row,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::{TransactionUpdate, edit_transaction_endpoint, update_transaction};
pub use list_endpoint::list_transaction_endpoint;
pub use query::{TransactionQuery, list_transactions};

#[cfg(test)]
pub(crate) use core::test_utils;
