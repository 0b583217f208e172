//! Core institution model and database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::InstitutionId,
    pagination::{PagedResults, page_offset},
};

/// A financial institution statements can be imported from.
///
/// Institutions are shared across owners: a bank is the same bank no
/// matter whose statement names it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    /// The ID of the institution.
    pub id: InstitutionId,
    /// The display name of the institution.
    pub name: String,
    /// The bank id the institution's statement files carry.
    pub fit_id: String,
    /// An optional pattern describing the stable portion of the
    /// institution's transaction fit ids.
    pub trans_fit_id_pat: Option<String>,
}

/// The fields accepted when creating or updating an institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionInput {
    /// The ID of the institution to update, or `None` to create one.
    pub id: Option<InstitutionId>,
    /// The display name of the institution.
    pub name: String,
    /// The bank id the institution's statement files carry.
    pub fit_id: String,
    /// An optional pattern describing the stable portion of the
    /// institution's transaction fit ids.
    pub trans_fit_id_pat: Option<String>,
}

/// Create the institution table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_institution_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS institution (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                fit_id TEXT NOT NULL UNIQUE,
                trans_fit_id_pat TEXT
            );",
        (),
    )?;

    Ok(())
}

/// Create or update an institution.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the name is empty or the bank id is already
///   registered,
/// - [Error::UpdateMissingInstitution] if the id refers to no
///   institution,
/// - or [Error::Sql] if there is some other SQL error.
pub fn upsert_institution(
    input: InstitutionInput,
    connection: &Connection,
) -> Result<Institution, Error> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "institution name cannot be empty".to_owned(),
        ));
    }

    let map_unique = |error: rusqlite::Error| match error {
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 2067 => {
            Error::Validation(format!(
                "an institution with bank ID \"{}\" already exists",
                input.fit_id
            ))
        }
        error => error.into(),
    };

    match input.id {
        None => {
            connection
                .execute(
                    "INSERT INTO institution (name, fit_id, trans_fit_id_pat)
                     VALUES (?1, ?2, ?3);",
                    (name, &input.fit_id, &input.trans_fit_id_pat),
                )
                .map_err(map_unique)?;

            let id = connection.last_insert_rowid();

            Ok(Institution {
                id,
                name: name.to_owned(),
                fit_id: input.fit_id,
                trans_fit_id_pat: input.trans_fit_id_pat,
            })
        }
        Some(id) => {
            let rows_affected = connection
                .execute(
                    "UPDATE institution SET name = ?1, fit_id = ?2, trans_fit_id_pat = ?3
                     WHERE id = ?4;",
                    (name, &input.fit_id, &input.trans_fit_id_pat, id),
                )
                .map_err(map_unique)?;

            if rows_affected == 0 {
                return Err(Error::UpdateMissingInstitution);
            }

            Ok(Institution {
                id,
                name: name.to_owned(),
                fit_id: input.fit_id,
                trans_fit_id_pat: input.trans_fit_id_pat,
            })
        }
    }
}

/// Retrieve an institution by `institution_id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if the id refers to no
/// institution, or [Error::Sql] if there is some other SQL error.
pub fn get_institution(
    institution_id: InstitutionId,
    connection: &Connection,
) -> Result<Institution, Error> {
    connection
        .prepare(
            "SELECT id, name, fit_id, trans_fit_id_pat FROM institution WHERE id = :id;",
        )?
        .query_one(&[(":id", &institution_id)], map_institution_row)
        .map_err(|error| error.into())
}

/// Find the institution whose statement files carry `fit_id`.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn find_institution_by_fit_id(
    fit_id: &str,
    connection: &Connection,
) -> Result<Option<Institution>, Error> {
    let result = connection
        .prepare(
            "SELECT id, name, fit_id, trans_fit_id_pat FROM institution WHERE fit_id = ?1;",
        )?
        .query_one([fit_id], map_institution_row);

    match result {
        Ok(institution) => Ok(Some(institution)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Retrieve a page of institutions ordered alphabetically by name.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_institutions(
    page: u64,
    page_size: u64,
    connection: &Connection,
) -> Result<PagedResults<Institution>, Error> {
    let total_hit_count: u64 =
        connection.query_row("SELECT COUNT(id) FROM institution;", [], |row| row.get(0))?;

    let results = connection
        .prepare(
            "SELECT id, name, fit_id, trans_fit_id_pat FROM institution
             ORDER BY name ASC, id ASC
             LIMIT ?1 OFFSET ?2;",
        )?
        .query_map((page_size, page_offset(page, page_size)), map_institution_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PagedResults::new(results, total_hit_count, page, page_size))
}

/// Delete an institution by ID. Its accounts are dropped by the foreign
/// key cascade.
///
/// # Errors
/// This function will return a [Error::DeleteMissingInstitution] if the
/// id refers to no institution, or [Error::Sql] if there is some other
/// SQL error.
pub fn delete_institution(
    institution_id: InstitutionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM institution WHERE id = ?1;", [institution_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingInstitution);
    }

    Ok(())
}

fn map_institution_row(row: &Row) -> Result<Institution, rusqlite::Error> {
    Ok(Institution {
        id: row.get(0)?,
        name: row.get(1)?,
        fit_id: row.get(2)?,
        trans_fit_id_pat: row.get(3)?,
    })
}
