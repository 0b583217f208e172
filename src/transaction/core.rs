//! Defines the core transaction model and database queries.

use std::collections::HashSet;

use rusqlite::{Connection, Row, ToSql, types::Type};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::ReservedCategories,
    database_id::{AccountId, CategoryId, OwnerId, TransactionId},
    month::month_end,
    pagination::{PagedResults, page_offset},
};

/// Whether money moved into or out of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money flowing into the account.
    Credit,
    /// Money flowing out of the account.
    Debit,
}

impl TransactionKind {
    /// The stored string form of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// The kind implied by a signed amount: negative amounts are debits.
    pub fn from_signed_amount(amount: f64) -> Self {
        if amount < 0.0 { Self::Debit } else { Self::Credit }
    }

    fn from_sql(text: &str, column: usize) -> Result<Self, rusqlite::Error> {
        match text {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(rusqlite::Error::FromSqlConversionFailure(
                column,
                Type::Text,
                format!("\"{other}\" is not a transaction kind").into(),
            )),
        }
    }
}

/// An expense or income event imported from a bank or entered by hand.
///
/// Amounts are stored signed: debits are negative and credits positive,
/// regardless of how the amount arrived in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The identifier assigned by the financial institution, used to
    /// deduplicate imports. Parts of a split share their original's fit
    /// id, so this is not unique.
    pub fit_id: String,
    /// The signed amount of money that moved.
    pub amt: f64,
    /// Whether the transaction is a credit or a debit.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the transaction was posted.
    pub date: Date,
    /// The description supplied by the bank or the user.
    pub name: String,
    /// The category the transaction is filed under.
    pub category: CategoryId,
    /// The account the transaction belongs to, when it came from one.
    pub account: Option<AccountId>,
    /// The owner namespace the transaction belongs to.
    pub owner: OwnerId,
}

/// The fields accepted when creating or updating a transaction.
///
/// The amount may arrive with either sign; it is normalized from `kind`,
/// so a debit is always stored negative. A missing category files the
/// transaction under the reserved Uncategorized category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    /// The ID of the transaction to update, or `None` to create one.
    pub id: Option<TransactionId>,
    /// The identifier assigned by the financial institution.
    pub fit_id: String,
    /// The amount of money that moved; the sign is taken from `kind`.
    pub amt: f64,
    /// Whether the transaction is a credit or a debit.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the transaction was posted.
    pub date: Date,
    /// The description supplied by the bank or the user.
    pub name: String,
    /// The category to file the transaction under; defaults to the
    /// reserved Uncategorized category.
    pub category: Option<CategoryId>,
    /// The account the transaction belongs to, if any.
    pub account: Option<AccountId>,
    /// The owner namespace the transaction belongs to.
    pub owner: OwnerId,
}

impl TransactionInput {
    /// The signed amount this input stores: negative for debits,
    /// positive for credits.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Credit => self.amt.abs(),
            TransactionKind::Debit => -self.amt.abs(),
        }
    }
}

/// Optional filters for the by-owner transaction listing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionFilter {
    /// Limit results to the month containing this date.
    pub month: Option<Date>,
    /// Limit results to one category.
    pub category: Option<CategoryId>,
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fit_id TEXT NOT NULL,
                amt REAL NOT NULL,
                kind TEXT NOT NULL,
                date TEXT NOT NULL,
                name TEXT NOT NULL,
                category INTEGER NOT NULL,
                account INTEGER,
                owner INTEGER NOT NULL,
                FOREIGN KEY(category) REFERENCES category(id),
                FOREIGN KEY(account) REFERENCES account(id) ON DELETE SET NULL
            );",
        (),
    )?;

    // Covers the by-owner listing and the month-ranged report queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_owner_date ON \"transaction\"(owner, date);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account ON \"transaction\"(account);",
        (),
    )?;

    Ok(())
}

/// Create or update a transaction from its input fields.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is not a finite number,
/// - [Error::InvalidCategory] if the category or account id does not
///   refer to a valid row,
/// - [Error::UpdateMissingTransaction] if the id refers to no
///   transaction,
/// - or [Error::Sql] if there is some other SQL error.
pub fn persist_transaction(
    input: TransactionInput,
    reserved: &ReservedCategories,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if !input.amt.is_finite() {
        return Err(Error::Validation("amt must be a finite number".to_owned()));
    }

    let category = input.category.unwrap_or(reserved.uncategorized);
    let amount = input.signed_amount();

    let map_foreign_key = |error: rusqlite::Error| match error {
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
            Error::InvalidCategory(Some(category))
        }
        error => error.into(),
    };

    match input.id {
        None => connection
            .prepare(
                "INSERT INTO \"transaction\" (fit_id, amt, kind, date, name, category, account, owner)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 RETURNING id, fit_id, amt, kind, date, name, category, account, owner;",
            )?
            .query_row(
                (
                    &input.fit_id,
                    amount,
                    input.kind.as_str(),
                    input.date,
                    &input.name,
                    category,
                    input.account,
                    input.owner,
                ),
                map_transaction_row,
            )
            .map_err(map_foreign_key),
        Some(id) => {
            let rows_affected = connection
                .execute(
                    "UPDATE \"transaction\"
                     SET fit_id = ?1, amt = ?2, kind = ?3, date = ?4, name = ?5,
                         category = ?6, account = ?7
                     WHERE id = ?8 AND owner = ?9;",
                    (
                        &input.fit_id,
                        amount,
                        input.kind.as_str(),
                        input.date,
                        &input.name,
                        category,
                        input.account,
                        id,
                        input.owner,
                    ),
                )
                .map_err(map_foreign_key)?;

            if rows_affected == 0 {
                return Err(Error::UpdateMissingTransaction);
            }

            get_transaction(id, connection)
        }
    }
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if `id` does not refer
/// to a valid transaction, or [Error::Sql] if there is some other SQL
/// error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, fit_id, amt, kind, date, name, category, account, owner
             FROM \"transaction\" WHERE id = :id;",
        )?
        .query_one(&[(":id", &id)], map_transaction_row)
        .map_err(|error| error.into())
}

/// Delete a transaction by its `id`.
///
/// # Errors
/// This function will return a [Error::DeleteMissingTransaction] if `id`
/// does not refer to a valid transaction, or [Error::Sql] if there is
/// some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1;", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Retrieve a page of an owner's transactions, newest first, optionally
/// filtered to one month and/or one category.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_transactions_by_owner(
    owner: OwnerId,
    filter: TransactionFilter,
    page: u64,
    page_size: u64,
    connection: &Connection,
) -> Result<PagedResults<Transaction>, Error> {
    let mut where_clauses = vec!["owner = :owner"];
    let mut params: Vec<(&str, &dyn ToSql)> = vec![(":owner", &owner)];

    let month_range = filter.month.map(|month| {
        (
            month.replace_day(1).unwrap().to_string(),
            month_end(month).to_string(),
        )
    });
    if let Some((start, end)) = &month_range {
        where_clauses.push("date BETWEEN :start AND :end");
        params.push((":start", start));
        params.push((":end", end));
    }

    let category = filter.category;
    if let Some(category) = &category {
        where_clauses.push("category = :category");
        params.push((":category", category));
    }

    let where_clause = where_clauses.join(" AND ");

    let total_hit_count: u64 = connection
        .prepare(&format!(
            "SELECT COUNT(id) FROM \"transaction\" WHERE {where_clause};"
        ))?
        .query_one(params.as_slice(), |row| row.get(0))?;

    let limit = page_size;
    let offset = page_offset(page, page_size);
    params.push((":limit", &limit));
    params.push((":offset", &offset));

    // Sort by date, then ID, to keep transaction order stable after
    // updates.
    let results = connection
        .prepare(&format!(
            "SELECT id, fit_id, amt, kind, date, name, category, account, owner
             FROM \"transaction\" WHERE {where_clause}
             ORDER BY date DESC, id DESC
             LIMIT :limit OFFSET :offset;"
        ))?
        .query_map(params.as_slice(), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PagedResults::new(results, total_hit_count, page, page_size))
}

/// Retrieve all of an owner's transactions posted in the inclusive date
/// range, oldest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_transactions_in_range(
    owner: OwnerId,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, fit_id, amt, kind, date, name, category, account, owner
             FROM \"transaction\"
             WHERE owner = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date ASC, id ASC;",
        )?
        .query_map(
            (owner, start.to_string(), end.to_string()),
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve an owner's earliest transaction.
///
/// # Errors
/// This function will return a [Error::NotFound] if the owner has no
/// transactions, or [Error::Sql] if there is some other SQL error.
pub fn get_oldest_transaction(
    owner: OwnerId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, fit_id, amt, kind, date, name, category, account, owner
             FROM \"transaction\" WHERE owner = :owner
             ORDER BY date ASC, id ASC LIMIT 1;",
        )?
        .query_one(&[(":owner", &owner)], map_transaction_row)
        .map_err(|error| error.into())
}

/// Retrieve the fit ids already recorded for `account` in the inclusive
/// date range.
///
/// The importer uses this to reject transactions that were already
/// imported from an overlapping statement file.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn fit_ids_for_account_in_range(
    account: AccountId,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<HashSet<String>, Error> {
    connection
        .prepare(
            "SELECT fit_id FROM \"transaction\"
             WHERE account = ?1 AND date BETWEEN ?2 AND ?3;",
        )?
        .query_map((account, start.to_string(), end.to_string()), |row| {
            row.get(0)
        })?
        .map(|maybe_fit_id| maybe_fit_id.map_err(|error| error.into()))
        .collect()
}

/// Map a database row to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let kind_text: String = row.get(3)?;

    Ok(Transaction {
        id: row.get(0)?,
        fit_id: row.get(1)?,
        amt: row.get(2)?,
        kind: TransactionKind::from_sql(&kind_text, 3)?,
        date: row.get(4)?,
        name: row.get(5)?,
        category: row.get(6)?,
        account: row.get(7)?,
        owner: row.get(8)?,
    })
}
