//! Core account model and database queries.

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{AccountId, InstitutionId, OwnerId},
    pagination::{PagedResults, page_offset},
};

/// The kinds of bank account the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// A checking (transactional) account.
    Checking,
    /// A savings account.
    Savings,
}

impl AccountType {
    /// The stored string form of the account type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "Checking",
            Self::Savings => "Savings",
        }
    }

    fn from_sql(text: &str, column: usize) -> Result<Self, rusqlite::Error> {
        match text {
            "Checking" => Ok(Self::Checking),
            "Savings" => Ok(Self::Savings),
            other => Err(rusqlite::Error::FromSqlConversionFailure(
                column,
                Type::Text,
                format!("\"{other}\" is not an account type").into(),
            )),
        }
    }
}

/// A bank account transactions are imported into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The bank's identifier for the account, unique within one
    /// institution.
    pub fit_id: String,
    /// Whether the account is a checking or savings account.
    pub account_type: AccountType,
    /// The display name of the account.
    pub name: String,
    /// The institution that holds the account.
    pub institution: InstitutionId,
    /// The owner namespace the account belongs to.
    pub owner: OwnerId,
}

/// The fields accepted when creating or updating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
    /// The ID of the account to update, or `None` to create one.
    pub id: Option<AccountId>,
    /// The bank's identifier for the account.
    pub fit_id: String,
    /// Whether the account is a checking or savings account.
    pub account_type: AccountType,
    /// The display name of the account.
    pub name: String,
    /// The institution that holds the account.
    pub institution: InstitutionId,
    /// The owner namespace the account belongs to.
    pub owner: OwnerId,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fit_id TEXT NOT NULL,
                account_type TEXT NOT NULL,
                name TEXT NOT NULL,
                institution INTEGER NOT NULL,
                owner INTEGER NOT NULL,
                FOREIGN KEY(institution) REFERENCES institution(id) ON DELETE CASCADE,
                UNIQUE(fit_id, institution)
            );",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_owner ON account(owner);",
        (),
    )?;

    Ok(())
}

/// Create or update an account.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the institution id is invalid or the
///   `(fit_id, institution)` pair already exists,
/// - [Error::UpdateMissingAccount] if the id refers to no account,
/// - or [Error::Sql] if there is some other SQL error.
pub fn upsert_account(input: AccountInput, connection: &Connection) -> Result<Account, Error> {
    let map_constraint = |error: rusqlite::Error| match error {
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
            Error::Validation(format!(
                "institution {} does not refer to a valid institution",
                input.institution
            ))
        }
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 2067 => {
            Error::Validation(format!(
                "an account with fit id \"{}\" already exists at this institution",
                input.fit_id
            ))
        }
        error => error.into(),
    };

    match input.id {
        None => {
            connection
                .execute(
                    "INSERT INTO account (fit_id, account_type, name, institution, owner)
                     VALUES (?1, ?2, ?3, ?4, ?5);",
                    (
                        &input.fit_id,
                        input.account_type.as_str(),
                        &input.name,
                        input.institution,
                        input.owner,
                    ),
                )
                .map_err(map_constraint)?;

            let id = connection.last_insert_rowid();

            Ok(Account {
                id,
                fit_id: input.fit_id,
                account_type: input.account_type,
                name: input.name,
                institution: input.institution,
                owner: input.owner,
            })
        }
        Some(id) => {
            let rows_affected = connection
                .execute(
                    "UPDATE account
                     SET fit_id = ?1, account_type = ?2, name = ?3, institution = ?4
                     WHERE id = ?5 AND owner = ?6;",
                    (
                        &input.fit_id,
                        input.account_type.as_str(),
                        &input.name,
                        input.institution,
                        id,
                        input.owner,
                    ),
                )
                .map_err(map_constraint)?;

            if rows_affected == 0 {
                return Err(Error::UpdateMissingAccount);
            }

            Ok(Account {
                id,
                fit_id: input.fit_id,
                account_type: input.account_type,
                name: input.name,
                institution: input.institution,
                owner: input.owner,
            })
        }
    }
}

/// Retrieve an account by `account_id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if the id refers to no
/// account, or [Error::Sql] if there is some other SQL error.
pub fn get_account(account_id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, fit_id, account_type, name, institution, owner
             FROM account WHERE id = :id;",
        )?
        .query_one(&[(":id", &account_id)], map_account_row)
        .map_err(|error| error.into())
}

/// Find the account an institution knows by `fit_id`, if it has been
/// seen before.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn find_account_by_fit_id(
    fit_id: &str,
    institution: InstitutionId,
    connection: &Connection,
) -> Result<Option<Account>, Error> {
    let result = connection
        .prepare(
            "SELECT id, fit_id, account_type, name, institution, owner
             FROM account WHERE fit_id = ?1 AND institution = ?2;",
        )?
        .query_one((fit_id, institution), map_account_row);

    match result {
        Ok(account) => Ok(Some(account)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Retrieve a page of an owner's accounts.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_accounts_by_owner(
    owner: OwnerId,
    page: u64,
    page_size: u64,
    connection: &Connection,
) -> Result<PagedResults<Account>, Error> {
    let total_hit_count: u64 = connection.query_row(
        "SELECT COUNT(id) FROM account WHERE owner = ?1;",
        [owner],
        |row| row.get(0),
    )?;

    let results = connection
        .prepare(
            "SELECT id, fit_id, account_type, name, institution, owner
             FROM account WHERE owner = ?1
             ORDER BY name ASC, id ASC
             LIMIT ?2 OFFSET ?3;",
        )?
        .query_map(
            (owner, page_size, page_offset(page, page_size)),
            map_account_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PagedResults::new(results, total_hit_count, page, page_size))
}

/// Delete an account by ID. Transactions that referenced it keep their
/// data but lose the account link.
///
/// # Errors
/// This function will return a [Error::DeleteMissingAccount] if the id
/// refers to no account, or [Error::Sql] if there is some other SQL
/// error.
pub fn delete_account(account_id: AccountId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM account WHERE id = ?1;", [account_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingAccount);
    }

    Ok(())
}

fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let account_type_text: String = row.get(2)?;

    Ok(Account {
        id: row.get(0)?,
        fit_id: row.get(1)?,
        account_type: AccountType::from_sql(&account_type_text, 2)?,
        name: row.get(3)?,
        institution: row.get(4)?,
        owner: row.get(5)?,
    })
}
