//! Pure month-by-month summaries of transaction activity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    category::Category,
    money::round_to_cents,
    month::{month_start, months_inclusive},
    transaction::Transaction,
};

/// Income, expenses and their difference for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetIncomeByMonth {
    /// The first day of the month the figures cover.
    pub date: Date,
    /// The month's credits.
    pub income: f64,
    /// The month's debits, as a positive figure.
    pub expense: f64,
    /// `income - expense`.
    pub net: f64,
}

/// One category's spending for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpendingByMonth {
    /// The first day of the month the figure covers.
    pub date: Date,
    /// The category the figure covers.
    pub category: Category,
    /// The month's spending in the category, as a positive figure.
    pub amt: f64,
}

/// Summarize net income by month.
///
/// Only months with transactions appear; months are sorted
/// chronologically and amounts rounded to cents.
pub fn summarize_net_income(transactions: &[Transaction]) -> Vec<NetIncomeByMonth> {
    let mut totals: HashMap<Date, (f64, f64)> = HashMap::new();

    for transaction in transactions {
        let entry = totals
            .entry(month_start(transaction.date))
            .or_insert((0.0, 0.0));
        if transaction.amt >= 0.0 {
            entry.0 += transaction.amt;
        } else {
            entry.1 += -transaction.amt;
        }
    }

    let mut months: Vec<Date> = totals.keys().copied().collect();
    months.sort();

    months
        .into_iter()
        .map(|month| {
            let (income, expense) = totals[&month];
            let income = round_to_cents(income);
            let expense = round_to_cents(expense);

            NetIncomeByMonth {
                date: month,
                income,
                expense,
                net: round_to_cents(income - expense),
            }
        })
        .collect()
}

/// Summarize one category's spending by month across the inclusive date
/// range.
///
/// Every month in the range appears, zero-filled when nothing was spent,
/// so charts get a continuous axis.
pub fn summarize_category_spending(
    transactions: &[Transaction],
    category: &Category,
    start: Date,
    end: Date,
) -> Vec<CategorySpendingByMonth> {
    let mut totals: HashMap<Date, f64> = HashMap::new();

    for transaction in transactions {
        if transaction.category != category.id {
            continue;
        }
        *totals.entry(month_start(transaction.date)).or_insert(0.0) += transaction.amt;
    }

    months_inclusive(start, end)
        .into_iter()
        .map(|month| CategorySpendingByMonth {
            date: month,
            category: category.clone(),
            amt: round_to_cents(totals.get(&month).copied().unwrap_or(0.0).abs()),
        })
        .collect()
}
