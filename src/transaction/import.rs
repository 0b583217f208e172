//! Imports OFX statement files dropped into the import directory.
//!
//! Files wait in `<import_dir>/inbox` and move to `<import_dir>/complete`
//! once their transactions are in the database. Transactions whose fit id
//! already exists for the account within the file's date range are
//! rejected as duplicates, and the owner's rules are applied to whatever
//! is left before it is inserted.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountInput, AccountType, find_account_by_fit_id, upsert_account},
    category::ReservedCategories,
    database_id::{AccountId, InstitutionId, OwnerId},
    institution::find_institution_by_fit_id,
    ofx::{self, OfxStatement, OfxTransaction},
    rule::{Rule, match_category, valid_rules_for_owner},
    transaction::{
        TransactionInput, TransactionKind,
        core::{fit_ids_for_account_in_range, persist_transaction},
    },
};

/// Statistics from one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// Number of statement files processed.
    pub files: usize,
    /// Number of transactions inserted.
    pub imported: usize,
    /// Number of transactions rejected as already imported.
    pub skipped: usize,
}

/// Import every statement file waiting in the inbox for `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::ImportIo] if the inbox cannot be read or a finished file
///   cannot be moved,
/// - [Error::InvalidOfx] if a file does not parse,
/// - [Error::UnknownInstitution] if no institution matches a file's bank
///   id,
/// - or [Error::Sql] for database errors.
pub fn import_transactions(
    owner: OwnerId,
    import_dir: &Path,
    reserved: &ReservedCategories,
    connection: &Connection,
) -> Result<ImportResult, Error> {
    let inbox = import_dir.join("inbox");
    let complete = import_dir.join("complete");
    for directory in [&inbox, &complete] {
        fs::create_dir_all(directory).map_err(|error| {
            Error::ImportIo(format!("could not create {}: {error}", directory.display()))
        })?;
    }

    let rules = valid_rules_for_owner(owner, connection)?;

    let mut result = ImportResult {
        files: 0,
        imported: 0,
        skipped: 0,
    };
    let mut finished_files: Vec<PathBuf> = Vec::new();

    for entry in fs::read_dir(&inbox)
        .map_err(|error| Error::ImportIo(format!("could not read {}: {error}", inbox.display())))?
    {
        let entry = entry.map_err(|error| Error::ImportIo(error.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let statement = ofx::read_ofx_file(&path)?;
        let (imported, skipped) =
            import_statement(owner, &statement, &rules, reserved, connection)?;

        result.files += 1;
        result.imported += imported;
        result.skipped += skipped;
        finished_files.push(path);
    }

    for path in finished_files {
        let destination = complete.join(path.file_name().unwrap_or_default());
        fs::rename(&path, &destination).map_err(|error| {
            Error::ImportIo(format!(
                "could not move {} to {}: {error}",
                path.display(),
                destination.display()
            ))
        })?;
    }

    tracing::info!(
        "imported {} transactions for owner {owner} from {} files ({} duplicates skipped)",
        result.imported,
        result.files,
        result.skipped
    );

    Ok(result)
}

fn import_statement(
    owner: OwnerId,
    statement: &OfxStatement,
    rules: &[Rule],
    reserved: &ReservedCategories,
    connection: &Connection,
) -> Result<(usize, usize), Error> {
    // Institutions are resolved first: account ids are only unique within
    // one institution.
    let institution = find_institution_by_fit_id(&statement.bank_id, connection)?
        .ok_or_else(|| Error::UnknownInstitution(statement.bank_id.clone()))?;

    let account = match find_account_by_fit_id(&statement.account_id, institution.id, connection)? {
        Some(account) => account,
        None => create_account_from_statement(owner, statement, institution.id, connection)?,
    };

    let mut transactions = statement.transactions.clone();
    if transactions.is_empty() {
        return Ok((0, 0));
    }
    transactions.sort_by_key(|transaction| transaction.posted);

    let range_start = transactions[0].posted;
    let range_end = transactions[transactions.len() - 1].posted;
    let existing_fit_ids =
        fit_ids_for_account_in_range(account.id, range_start, range_end, connection)?;

    let mut imported = 0;
    let mut skipped = 0;

    for transaction in &transactions {
        if existing_fit_ids.contains(&transaction.fit_id) {
            skipped += 1;
            continue;
        }

        let input = decode_ofx_transaction(transaction, owner, account.id, rules);
        persist_transaction(input, reserved, connection)?;
        imported += 1;
    }

    Ok((imported, skipped))
}

fn decode_ofx_transaction(
    transaction: &OfxTransaction,
    owner: OwnerId,
    account: AccountId,
    rules: &[Rule],
) -> TransactionInput {
    TransactionInput {
        id: None,
        fit_id: transaction.fit_id.clone(),
        amt: transaction.amount,
        kind: TransactionKind::from_signed_amount(transaction.amount),
        date: transaction.posted,
        name: transaction.name.clone(),
        category: match_category(rules, &transaction.name, transaction.amount),
        account: Some(account),
        owner,
    }
}

fn create_account_from_statement(
    owner: OwnerId,
    statement: &OfxStatement,
    institution: InstitutionId,
    connection: &Connection,
) -> Result<Account, Error> {
    let account_type = if statement.account_type == "SAVINGS" {
        AccountType::Savings
    } else {
        AccountType::Checking
    };

    upsert_account(
        AccountInput {
            id: None,
            fit_id: statement.account_id.clone(),
            account_type,
            name: statement.account_type.clone(),
            institution,
            owner,
        },
        connection,
    )
}
