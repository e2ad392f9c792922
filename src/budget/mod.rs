//! Budgets: the single monthly budget row per user, calendar-month expense
//! aggregation, and the endpoint for setting the budget amount.

mod core;
mod endpoint;

pub use self::core::{
    Budget, BudgetId, BudgetStatus, create_budget_table, get_budget, get_current_budget,
    list_budgets, mark_alert_sent, month_window, percent_used, sum_month_expenses, upsert_budget,
};
pub use endpoint::set_budget_endpoint;
