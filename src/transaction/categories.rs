//! The built-in transaction categories.

use super::core::TransactionKind;

/// A category that transactions can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// The stable identifier stored on transactions.
    pub id: &'static str,
    /// The display name shown in forms.
    pub name: &'static str,
    /// Whether the category applies to expenses or income.
    pub kind: TransactionKind,
}

/// Every category, income first.
pub const CATEGORIES: &[Category] = &[
    Category {
        id: "salary",
        name: "Salary",
        kind: TransactionKind::Income,
    },
    Category {
        id: "freelance",
        name: "Freelance",
        kind: TransactionKind::Income,
    },
    Category {
        id: "investments",
        name: "Investments",
        kind: TransactionKind::Income,
    },
    Category {
        id: "business",
        name: "Business",
        kind: TransactionKind::Income,
    },
    Category {
        id: "rental",
        name: "Rental",
        kind: TransactionKind::Income,
    },
    Category {
        id: "other-income",
        name: "Other Income",
        kind: TransactionKind::Income,
    },
    Category {
        id: "housing",
        name: "Housing",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "transportation",
        name: "Transportation",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "groceries",
        name: "Groceries",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "utilities",
        name: "Utilities",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "entertainment",
        name: "Entertainment",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "food",
        name: "Food",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "shopping",
        name: "Shopping",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "healthcare",
        name: "Healthcare",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "education",
        name: "Education",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "personal",
        name: "Personal Care",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "travel",
        name: "Travel",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "insurance",
        name: "Insurance",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "gifts",
        name: "Gifts & Donations",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "bills",
        name: "Bills & Fees",
        kind: TransactionKind::Expense,
    },
    Category {
        id: "other-expense",
        name: "Other Expenses",
        kind: TransactionKind::Expense,
    },
];

/// The categories that apply to transactions of `kind`.
pub fn categories_for(kind: TransactionKind) -> impl Iterator<Item = &'static Category> {
    CATEGORIES.iter().filter(move |category| category.kind == kind)
}

/// The expense category ids as a comma-separated list, for the receipt
/// scanner's category suggestion.
pub fn expense_category_ids() -> String {
    categories_for(TransactionKind::Expense)
        .map(|category| category.id)
        .collect::<Vec<_>>()
        .join(",")
}
