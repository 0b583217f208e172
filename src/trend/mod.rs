//! Spending and income trends broken down by month.
//!
//! Trends are pure summaries over a date range of an owner's
//! transactions: net income per month, and one category's spending per
//! month.

mod core;
mod endpoints;

pub use core::{
    CategorySpendingByMonth, NetIncomeByMonth, summarize_category_spending, summarize_net_income,
};
pub use endpoints::{
    TrendState, get_category_spending_endpoint, get_net_income_endpoint,
};
