//! Building the monthly budget report.
//!
//! The report is a pure computation over a snapshot of one owner's
//! budgets and transactions. It performs no I/O of its own; the route
//! handler fetches the inputs and hands them in.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    budget::Budget,
    category::{Category, ReservedCategories, SYSTEM_OWNER},
    database_id::{BudgetId, CategoryId, OwnerId},
    money::{round_to_cents, to_cents},
    month::{month_start, months_between, next_month},
    transaction::Transaction,
};

/// The id the synthetic Unallocated report entry carries.
///
/// SQLite row ids start at 1, so 0 never collides with a stored budget.
pub const UNALLOCATED_BUDGET_ID: BudgetId = 0;

/// A budget enriched for one target month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedBudget {
    /// The ID of the underlying budget, or [UNALLOCATED_BUDGET_ID] for
    /// the synthetic Unallocated entry.
    pub id: BudgetId,
    /// The budget's category, resolved to its full value.
    pub category: Category,
    /// The amount due each cycle.
    pub amt: f64,
    /// The portion of `amt` due in the target month: `amt` itself in a
    /// due month, zero otherwise.
    pub month_amt: f64,
    /// Progress toward the current cycle's `amt`, accumulated from the
    /// budget's creation through the target month.
    pub accumulated_amt: f64,
    /// The amount allocated to the budget's category within the target
    /// month.
    pub allocated_amt: f64,
    /// The cycle length in months.
    pub period: i64,
    /// The first month the budget applies to.
    pub create_date: Date,
    /// The first month the budget no longer applies to, if set.
    pub inactive_date: Option<Date>,
    /// The owner namespace the budget belongs to.
    pub owner: OwnerId,
}

/// The monthly budget report: every active budget enriched for the
/// target month, bucketed for display, with income/expense totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    /// Budgets whose category is the reserved Income category or one of
    /// its subcategories.
    pub income: Vec<AllocatedBudget>,
    /// Expense budgets due in the target month.
    pub budgets: Vec<AllocatedBudget>,
    /// Expense budgets not due this month, plus the synthetic
    /// Unallocated entry aggregating spending no budget covers.
    pub other: Vec<AllocatedBudget>,
    /// The income due this month across income budgets.
    pub budgeted_income: f64,
    /// The spending due this month across expense budgets.
    pub budgeted_expenses: f64,
    /// The income actually allocated this month.
    pub actual_income: f64,
    /// The spending actually allocated this month.
    pub actual_expenses: f64,
    /// `budgeted_income - budgeted_expenses`.
    pub anticipated_net: f64,
}

/// Whether a budget applies to the target month.
///
/// A budget applies from its creation month up to, but not including,
/// the month its inactive date lands on.
pub fn is_active(budget: &Budget, target_month: Date) -> bool {
    budget.create_date <= target_month
        && budget
            .inactive_date
            .is_none_or(|inactive| inactive > target_month)
}

/// The portion of the budget's amount due in the target month.
///
/// An amount comes due every `period` months counted from the creation
/// month.
pub fn month_amount(budget: &Budget, target_month: Date) -> f64 {
    let months_since_create = months_between(budget.create_date, target_month);

    if months_since_create % budget.period == 0 {
        budget.amt
    } else {
        0.0
    }
}

/// Sum each category's transaction amounts by calendar month.
fn monthly_allocations(transactions: &[Transaction]) -> HashMap<(CategoryId, Date), f64> {
    let mut totals = HashMap::new();

    for transaction in transactions {
        let month = month_start(transaction.date);
        *totals.entry((transaction.category, month)).or_insert(0.0) += transaction.amt;
    }

    totals
}

/// Progress toward the budget's current cycle, walking every month from
/// its creation through the target month.
///
/// Each month's allocation to the budget's category is added; whenever
/// the running total reaches `amt`, the cycle is considered funded and
/// `amt` is subtracted, carrying any surplus into the next cycle.
/// Shortfalls persist until covered.
fn accumulated_amount(
    budget: &Budget,
    target_month: Date,
    allocations: &HashMap<(CategoryId, Date), f64>,
) -> f64 {
    let mut accumulated = 0.0;
    let mut month = budget.create_date;

    loop {
        let allocated = allocations
            .get(&(budget.category, month))
            .copied()
            .unwrap_or(0.0)
            .abs();
        accumulated += allocated;

        if budget.amt > 0.0 {
            while to_cents(accumulated) >= to_cents(budget.amt) {
                accumulated -= budget.amt;
            }
        }

        if month >= target_month {
            break;
        }
        month = next_month(month);
    }

    round_to_cents(accumulated)
}

/// Build the budget report for one owner and month.
///
/// `budgets` is the owner's full budget set (inactive ones are filtered
/// here), `transactions` must cover every month from the earliest budget
/// creation date through the end of the target month, and `categories`
/// resolves every category id the budgets and transactions mention.
pub fn build_budget_report(
    owner: OwnerId,
    target_month: Date,
    budgets: &[Budget],
    transactions: &[Transaction],
    categories: &HashMap<CategoryId, Category>,
    reserved: &ReservedCategories,
) -> BudgetReport {
    let target_month = month_start(target_month);
    let allocations = monthly_allocations(transactions);

    let resolve_category = |id: CategoryId| {
        categories.get(&id).cloned().unwrap_or(Category {
            id,
            name: String::new(),
            parent_category: None,
            owner: SYSTEM_OWNER,
        })
    };

    let is_income = |id: CategoryId| {
        id == reserved.income
            || categories
                .get(&id)
                .is_some_and(|category| category.parent_category == Some(reserved.income))
    };

    let mut income = Vec::new();
    let mut due = Vec::new();
    let mut other = Vec::new();
    let mut covered_categories: HashSet<CategoryId> = HashSet::new();

    for budget in budgets {
        if !is_active(budget, target_month) {
            continue;
        }

        covered_categories.insert(budget.category);

        let allocated = allocations
            .get(&(budget.category, target_month))
            .copied()
            .unwrap_or(0.0)
            .abs();
        let month_amt = month_amount(budget, target_month);

        let entry = AllocatedBudget {
            id: budget.id,
            category: resolve_category(budget.category),
            amt: budget.amt,
            month_amt: round_to_cents(month_amt),
            accumulated_amt: accumulated_amount(budget, target_month, &allocations),
            allocated_amt: round_to_cents(allocated),
            period: budget.period,
            create_date: budget.create_date,
            inactive_date: budget.inactive_date,
            owner: budget.owner,
        };

        if is_income(budget.category) {
            income.push(entry);
        } else if entry.month_amt != 0.0 && budget.category != reserved.unallocated {
            due.push(entry);
        } else {
            other.push(entry);
        }
    }

    for bucket in [&mut income, &mut due, &mut other] {
        bucket.sort_by(|a, b| a.category.name.cmp(&b.category.name).then(a.id.cmp(&b.id)));
    }

    // Whatever the month's transactions allocated outside the covered
    // categories is reported under the synthetic Unallocated entry.
    let remainder: f64 = allocations
        .iter()
        .filter(|((category, month), _)| {
            *month == target_month && !covered_categories.contains(category)
        })
        .map(|(_, amount)| amount)
        .sum();
    other.push(AllocatedBudget {
        id: UNALLOCATED_BUDGET_ID,
        category: resolve_category(reserved.unallocated),
        amt: 0.0,
        month_amt: 0.0,
        accumulated_amt: 0.0,
        allocated_amt: round_to_cents(remainder.abs()),
        period: 1,
        create_date: target_month,
        inactive_date: None,
        owner,
    });

    let budgeted_income = round_to_cents(income.iter().map(|entry| entry.month_amt).sum());
    let budgeted_expenses = round_to_cents(
        due.iter()
            .chain(other.iter())
            .map(|entry| entry.month_amt)
            .sum(),
    );
    let actual_income = round_to_cents(income.iter().map(|entry| entry.allocated_amt).sum());
    let actual_expenses = round_to_cents(
        due.iter()
            .chain(other.iter())
            .map(|entry| entry.allocated_amt)
            .sum(),
    );

    BudgetReport {
        income,
        budgets: due,
        other,
        budgeted_income,
        budgeted_expenses,
        actual_income,
        actual_expenses,
        anticipated_net: round_to_cents(budgeted_income - budgeted_expenses),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use time::{Date, macros::date};

    use crate::{
        budget::Budget,
        category::{Category, ReservedCategories},
        database_id::CategoryId,
        transaction::{Transaction, TransactionKind},
    };

    use super::{UNALLOCATED_BUDGET_ID, build_budget_report, is_active, month_amount};

    const OWNER: i64 = 1;

    fn reserved() -> ReservedCategories {
        ReservedCategories::default()
    }

    fn categories(extra: &[(CategoryId, &str, Option<CategoryId>)]) -> HashMap<i64, Category> {
        let mut map = HashMap::new();
        let system = reserved();

        for (id, name) in [
            (system.income, "Income"),
            (system.uncategorized, "Uncategorized"),
            (system.unallocated, "Unallocated"),
        ] {
            map.insert(
                id,
                Category {
                    id,
                    name: name.to_owned(),
                    parent_category: None,
                    owner: 0,
                },
            );
        }

        for (id, name, parent) in extra {
            map.insert(
                *id,
                Category {
                    id: *id,
                    name: (*name).to_owned(),
                    parent_category: *parent,
                    owner: OWNER,
                },
            );
        }

        map
    }

    fn budget(id: i64, category: i64, amt: f64, period: i64, create_date: Date) -> Budget {
        Budget {
            id,
            category,
            amt,
            period,
            create_date,
            inactive_date: None,
            owner: OWNER,
        }
    }

    fn transaction(id: i64, category: i64, amt: f64, date: Date) -> Transaction {
        Transaction {
            id,
            fit_id: format!("FIT-{id}"),
            amt,
            kind: TransactionKind::from_signed_amount(amt),
            date,
            name: "test".to_owned(),
            category,
            account: None,
            owner: OWNER,
        }
    }

    #[test]
    fn quarterly_budget_is_due_every_third_month() {
        let groceries = budget(1, 10, 300.0, 3, date!(2024 - 01 - 01));

        for (month, want) in [
            (date!(2024 - 01 - 01), 300.0),
            (date!(2024 - 02 - 01), 0.0),
            (date!(2024 - 03 - 01), 0.0),
            (date!(2024 - 04 - 01), 300.0),
            (date!(2024 - 05 - 01), 0.0),
            (date!(2024 - 07 - 01), 300.0),
            (date!(2024 - 10 - 01), 300.0),
        ] {
            assert_eq!(month_amount(&groceries, month), want, "month {month}");
        }
    }

    #[test]
    fn inactive_date_excludes_its_own_month_and_later() {
        let mut groceries = budget(1, 10, 300.0, 1, date!(2024 - 01 - 01));
        groceries.inactive_date = Some(date!(2024 - 03 - 01));

        assert!(is_active(&groceries, date!(2024 - 02 - 01)));
        assert!(!is_active(&groceries, date!(2024 - 03 - 01)));
        assert!(!is_active(&groceries, date!(2024 - 04 - 01)));
    }

    #[test]
    fn budgets_created_after_the_target_month_are_excluded() {
        let groceries = budget(1, 10, 300.0, 1, date!(2024 - 05 - 01));

        assert!(!is_active(&groceries, date!(2024 - 04 - 01)));
        assert!(is_active(&groceries, date!(2024 - 05 - 01)));
    }

    #[test]
    fn accumulation_carries_shortfall_forward() {
        // $600 every 6 months, funded $80 a month: after 6 months only
        // $480 is set aside, and the shortfall persists into month 7.
        let cats = categories(&[(10, "Car Repairs", None)]);
        let budgets = vec![budget(1, 10, 600.0, 6, date!(2024 - 01 - 01))];
        let transactions: Vec<_> = (0..7)
            .map(|i| {
                let month = time::Month::try_from(1 + i as u8).unwrap();
                transaction(
                    i,
                    10,
                    -80.0,
                    Date::from_calendar_date(2024, month, 15).unwrap(),
                )
            })
            .collect();

        let june = build_budget_report(
            OWNER,
            date!(2024 - 06 - 01),
            &budgets,
            &transactions,
            &cats,
            &reserved(),
        );
        let july = build_budget_report(
            OWNER,
            date!(2024 - 07 - 01),
            &budgets,
            &transactions,
            &cats,
            &reserved(),
        );

        // Not due in June, so the entry sits in the other bucket.
        let june_entry = june
            .budgets
            .iter()
            .chain(june.other.iter())
            .find(|entry| entry.id == 1)
            .unwrap();
        assert_eq!(june_entry.accumulated_amt, 480.0);

        let july_entry = july
            .budgets
            .iter()
            .chain(july.other.iter())
            .find(|entry| entry.id == 1)
            .unwrap();
        assert_eq!(july_entry.accumulated_amt, 560.0);
    }

    #[test]
    fn accumulation_surplus_carries_into_the_next_cycle() {
        // Funding reaches $600 in month 6 with $50 to spare; the cycle
        // is funded and the surplus seeds the next one.
        let cats = categories(&[(10, "Car Repairs", None)]);
        let budgets = vec![budget(1, 10, 600.0, 6, date!(2024 - 01 - 01))];
        let mut transactions: Vec<_> = (0..5)
            .map(|i| {
                let month = time::Month::try_from(1 + i as u8).unwrap();
                transaction(
                    i,
                    10,
                    -100.0,
                    Date::from_calendar_date(2024, month, 15).unwrap(),
                )
            })
            .collect();
        transactions.push(transaction(5, 10, -150.0, date!(2024 - 06 - 15)));

        let june = build_budget_report(
            OWNER,
            date!(2024 - 06 - 01),
            &budgets,
            &transactions,
            &cats,
            &reserved(),
        );

        let entry = june
            .budgets
            .iter()
            .chain(june.other.iter())
            .find(|entry| entry.id == 1)
            .unwrap();
        assert_eq!(entry.accumulated_amt, 50.0);
    }

    #[test]
    fn allocated_amount_is_the_target_months_spending() {
        let cats = categories(&[(10, "Groceries", None)]);
        let budgets = vec![budget(1, 10, 400.0, 1, date!(2024 - 01 - 01))];
        let transactions = vec![
            transaction(1, 10, -120.5, date!(2024 - 03 - 05)),
            transaction(2, 10, -79.5, date!(2024 - 03 - 20)),
            // A different month; must not count.
            transaction(3, 10, -999.0, date!(2024 - 02 - 10)),
        ];

        let report = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &budgets,
            &transactions,
            &cats,
            &reserved(),
        );

        assert_eq!(report.budgets[0].allocated_amt, 200.0);
        assert_eq!(report.actual_expenses, 200.0);
    }

    #[test]
    fn income_bucket_includes_income_subcategories() {
        let system = reserved();
        let cats = categories(&[(20, "Salary", Some(system.income))]);
        let budgets = vec![
            budget(1, 20, 3000.0, 1, date!(2024 - 01 - 01)),
            budget(2, system.income, 100.0, 1, date!(2024 - 01 - 01)),
        ];

        let report = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &budgets,
            &[],
            &cats,
            &reserved(),
        );

        assert_eq!(report.income.len(), 2);
        assert!(report.budgets.is_empty());
        assert_eq!(report.budgeted_income, 3100.0);
    }

    #[test]
    fn anticipated_net_has_the_right_sign() {
        let system = reserved();
        let cats = categories(&[(10, "Rent", None), (20, "Salary", Some(system.income))]);
        let salary = budget(1, 20, 3000.0, 1, date!(2024 - 01 - 01));
        let cheap_rent = budget(2, 10, 2600.0, 1, date!(2024 - 01 - 01));
        let pricey_rent = budget(3, 10, 3200.0, 1, date!(2024 - 01 - 01));

        let surplus = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &[salary.clone(), cheap_rent],
            &[],
            &cats,
            &reserved(),
        );
        let deficit = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &[salary, pricey_rent],
            &[],
            &cats,
            &reserved(),
        );

        assert_eq!(surplus.anticipated_net, 400.0);
        assert_eq!(deficit.anticipated_net, -200.0);
    }

    #[test]
    fn not_due_budgets_land_in_other() {
        let cats = categories(&[(10, "Insurance", None)]);
        let budgets = vec![budget(1, 10, 900.0, 6, date!(2024 - 01 - 01))];

        let report = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &budgets,
            &[],
            &cats,
            &reserved(),
        );

        assert!(report.budgets.is_empty());
        let entry = report.other.iter().find(|entry| entry.id == 1).unwrap();
        assert_eq!(entry.month_amt, 0.0);
        assert_eq!(report.budgeted_expenses, 0.0);
    }

    #[test]
    fn unbudgeted_spending_is_reported_as_unallocated() {
        let cats = categories(&[(10, "Groceries", None), (30, "Hobbies", None)]);
        let budgets = vec![budget(1, 10, 400.0, 1, date!(2024 - 01 - 01))];
        let transactions = vec![
            transaction(1, 10, -100.0, date!(2024 - 03 - 05)),
            transaction(2, 30, -60.0, date!(2024 - 03 - 07)),
            transaction(3, reserved().uncategorized, -15.0, date!(2024 - 03 - 09)),
        ];

        let report = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &budgets,
            &transactions,
            &cats,
            &reserved(),
        );

        let unallocated = report.other.last().unwrap();
        assert_eq!(unallocated.id, UNALLOCATED_BUDGET_ID);
        assert_eq!(unallocated.category.name, "Unallocated");
        assert_eq!(unallocated.allocated_amt, 75.0);
        assert_eq!(report.actual_expenses, 175.0);
    }

    #[test]
    fn inactive_budgets_do_not_appear_in_the_report() {
        let cats = categories(&[(10, "Groceries", None)]);
        let mut inactive = budget(1, 10, 400.0, 1, date!(2024 - 01 - 01));
        inactive.inactive_date = Some(date!(2024 - 03 - 01));

        let report = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &[inactive],
            &[],
            &cats,
            &reserved(),
        );

        // Only the synthetic Unallocated entry remains.
        assert!(report.income.is_empty());
        assert!(report.budgets.is_empty());
        assert_eq!(report.other.len(), 1);
        assert_eq!(report.other[0].id, UNALLOCATED_BUDGET_ID);
    }

    #[test]
    fn report_amounts_are_rounded_to_cents() {
        let cats = categories(&[(10, "Groceries", None)]);
        let budgets = vec![budget(1, 10, 400.0, 1, date!(2024 - 01 - 01))];
        let transactions = vec![
            transaction(1, 10, -0.1, date!(2024 - 03 - 05)),
            transaction(2, 10, -0.2, date!(2024 - 03 - 06)),
        ];

        let report = build_budget_report(
            OWNER,
            date!(2024 - 03 - 01),
            &budgets,
            &transactions,
            &cats,
            &reserved(),
        );

        assert_eq!(report.budgets[0].allocated_amt, 0.3);
        assert_eq!(report.actual_expenses, 0.3);
    }
}
