//! Core budget model and database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{BudgetId, CategoryId, OwnerId},
    month::month_start,
};

/// A recurring spending or income target for one category.
///
/// Every `period` months starting from `create_date`, `amt` comes due.
/// Budget dates only carry month precision: they are normalized to the
/// first of their month on write. A budget is never hard-deleted; setting
/// `inactive_date` ends its applicability from that month on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The category the budget tracks.
    pub category: CategoryId,
    /// The amount due each cycle.
    pub amt: f64,
    /// The cycle length in months.
    pub period: i64,
    /// The first month the budget applies to.
    pub create_date: Date,
    /// The first month the budget no longer applies to, if it has been
    /// deactivated.
    pub inactive_date: Option<Date>,
    /// The owner namespace the budget belongs to.
    pub owner: OwnerId,
}

/// The fields accepted when creating or updating a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    /// The ID of the budget to update, or `None` to create one.
    pub id: Option<BudgetId>,
    /// The category the budget tracks.
    pub category: CategoryId,
    /// The amount due each cycle.
    pub amt: f64,
    /// The cycle length in months.
    pub period: i64,
    /// The first month the budget applies to; any day of the month may
    /// be given.
    pub create_date: Date,
    /// The first month the budget no longer applies to.
    pub inactive_date: Option<Date>,
    /// The owner namespace the budget belongs to.
    pub owner: OwnerId,
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category INTEGER NOT NULL,
                amt REAL NOT NULL,
                period INTEGER NOT NULL,
                create_date TEXT NOT NULL,
                inactive_date TEXT,
                owner INTEGER NOT NULL,
                FOREIGN KEY(category) REFERENCES category(id) ON DELETE CASCADE
            );",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_budget_owner ON budget(owner);",
        (),
    )?;

    Ok(())
}

/// Create or update a budget.
///
/// Dates are normalized to the first of their month before they are
/// stored.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the period is below 1 or the amount is
///   negative or not finite,
/// - [Error::InvalidCategory] if the category does not exist,
/// - [Error::UpdateMissingBudget] if the id refers to no budget,
/// - or [Error::Sql] if there is some other SQL error.
pub fn upsert_budget(input: BudgetInput, connection: &Connection) -> Result<Budget, Error> {
    if input.period < 1 {
        return Err(Error::Validation("period must be at least 1".to_owned()));
    }

    if !input.amt.is_finite() || input.amt < 0.0 {
        return Err(Error::Validation(
            "amt must be a non-negative number".to_owned(),
        ));
    }

    let create_date = month_start(input.create_date);
    let inactive_date = input.inactive_date.map(month_start);

    let map_foreign_key = |error: rusqlite::Error| match error {
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
            Error::InvalidCategory(Some(input.category))
        }
        error => error.into(),
    };

    match input.id {
        None => {
            connection
                .execute(
                    "INSERT INTO budget (category, amt, period, create_date, inactive_date, owner)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    (
                        input.category,
                        input.amt,
                        input.period,
                        create_date,
                        inactive_date,
                        input.owner,
                    ),
                )
                .map_err(map_foreign_key)?;

            let id = connection.last_insert_rowid();

            Ok(Budget {
                id,
                category: input.category,
                amt: input.amt,
                period: input.period,
                create_date,
                inactive_date,
                owner: input.owner,
            })
        }
        Some(id) => {
            let rows_affected = connection
                .execute(
                    "UPDATE budget
                     SET category = ?1, amt = ?2, period = ?3, create_date = ?4, inactive_date = ?5
                     WHERE id = ?6 AND owner = ?7;",
                    (
                        input.category,
                        input.amt,
                        input.period,
                        create_date,
                        inactive_date,
                        id,
                        input.owner,
                    ),
                )
                .map_err(map_foreign_key)?;

            if rows_affected == 0 {
                return Err(Error::UpdateMissingBudget);
            }

            Ok(Budget {
                id,
                category: input.category,
                amt: input.amt,
                period: input.period,
                create_date,
                inactive_date,
                owner: input.owner,
            })
        }
    }
}

/// Retrieve a budget by `budget_id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if the id refers to no
/// budget, or [Error::Sql] if there is some other SQL error.
pub fn get_budget(budget_id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(
            "SELECT id, category, amt, period, create_date, inactive_date, owner
             FROM budget WHERE id = :id;",
        )?
        .query_one(&[(":id", &budget_id)], map_budget_row)
        .map_err(|error| error.into())
}

/// Retrieve all of an owner's budgets, including deactivated ones.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_budgets_by_owner(owner: OwnerId, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, category, amt, period, create_date, inactive_date, owner
             FROM budget WHERE owner = ?1
             ORDER BY id ASC;",
        )?
        .query_map([owner], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Deactivate a budget from the month containing `as_of` onwards.
///
/// This is the budget's soft delete; rows are never removed.
///
/// # Errors
/// This function will return a [Error::UpdateMissingBudget] if the id
/// refers to no budget, or [Error::Sql] if there is some other SQL error.
pub fn deactivate_budget(
    budget_id: BudgetId,
    as_of: Date,
    connection: &Connection,
) -> Result<Budget, Error> {
    let rows_affected = connection.execute(
        "UPDATE budget SET inactive_date = ?1 WHERE id = ?2;",
        (month_start(as_of), budget_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    get_budget(budget_id, connection)
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        category: row.get(1)?,
        amt: row.get(2)?,
        period: row.get(3)?,
        create_date: row.get(4)?,
        inactive_date: row.get(5)?,
        owner: row.get(6)?,
    })
}
