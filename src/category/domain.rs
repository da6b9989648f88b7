//! Core category domain types.

use serde::{Deserialize, Serialize};

use crate::database_id::CategoryId;

/// Which side of the ledger a category applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    /// The category only applies to income transactions.
    Income,
    /// The category only applies to expense transactions.
    Expense,
    /// The category applies to both sides of the ledger.
    Both,
}

impl CategoryType {
    /// The lowercase string stored in the database for this category type.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
            CategoryType::Both => "both",
        }
    }

    /// Parse the stored database representation of a category type.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "income" => Some(CategoryType::Income),
            "expense" => Some(CategoryType::Expense),
            "both" => Some(CategoryType::Both),
            _ => None,
        }
    }
}

/// A label for grouping transactions (e.g., 'Groceries', 'Salary').
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name of the category.
    pub name: String,
    /// Which side of the ledger the category applies to.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// An emoji or icon name shown next to the category.
    pub icon: String,
    /// A CSS color used when charting the category.
    pub color: String,
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    /// The name of the category.
    pub name: String,
    /// Which side of the ledger the category applies to.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// An emoji or icon name shown next to the category.
    #[serde(default)]
    pub icon: String,
    /// A CSS color used when charting the category.
    #[serde(default)]
    pub color: String,
}

/// The request body for editing a category. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryUpdate {
    /// The new name.
    pub name: Option<String>,
    /// The new category type.
    #[serde(rename = "type")]
    pub kind: Option<CategoryType>,
    /// The new icon.
    pub icon: Option<String>,
    /// The new color.
    pub color: Option<String>,
}
