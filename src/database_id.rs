//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// Database identifier for an account.
pub type AccountId = i64;
/// Database identifier for a category.
pub type CategoryId = i64;
/// Database identifier for a ledger transaction.
pub type TransactionId = i64;
/// Database identifier for a budget.
pub type BudgetId = i64;
/// Database identifier for a credit.
pub type CreditId = i64;
/// Database identifier for a credit payment.
pub type PaymentId = i64;
