//! Splitting one transaction into multiple category-tagged parts.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{CategoryId, TransactionId},
    money::{round_to_cents, to_cents},
    transaction::{Transaction, TransactionKind, core},
};

/// One part of a transaction split: a signed amount and the category it
/// books to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPart {
    /// The signed amount of this part. Negative parts are allowed so
    /// refunds can be carved out of a larger transaction.
    pub amt: f64,
    /// The category this part books to.
    pub category: CategoryId,
}

/// Replace one transaction with parts that sum to its amount.
///
/// Every part shares the original's fit id, date, name, account and
/// owner; each carries its own amount and category. The parts' amounts
/// must sum to the original's amount exactly, to the cent.
///
/// Validation happens before anything is written. The writes themselves
/// are issued one at a time (one insert per part, then the delete of the
/// original) with no atomicity across the sequence. A failure partway
/// leaves the split partially applied and is surfaced as
/// [Error::PartialSplit]; nothing is rolled back or retried.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist,
/// - [Error::Validation] if fewer than two parts are given or a part's
///   amount is not a finite number,
/// - [Error::SplitImbalance] if the parts do not sum to the original
///   amount,
/// - [Error::PartialSplit] if a write fails after the first one landed,
/// - or [Error::Sql] for other SQL errors.
pub fn split_transaction(
    transaction_id: TransactionId,
    parts: &[SplitPart],
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let original = core::get_transaction(transaction_id, connection)?;

    if parts.len() < 2 {
        return Err(Error::Validation(
            "a split needs at least two parts".to_owned(),
        ));
    }

    if parts.iter().any(|part| !part.amt.is_finite()) {
        return Err(Error::Validation(
            "every split part must have a finite amount".to_owned(),
        ));
    }

    let want_cents = to_cents(original.amt);
    let got_cents: i64 = parts.iter().map(|part| to_cents(part.amt)).sum();
    if want_cents != got_cents {
        return Err(Error::SplitImbalance {
            want: round_to_cents(original.amt),
            got: round_to_cents(parts.iter().map(|part| part.amt).sum()),
        });
    }

    // One insert per part plus the delete of the original.
    let total = parts.len() + 1;
    let mut created = Vec::with_capacity(parts.len());

    for (applied, part) in parts.iter().enumerate() {
        match insert_part(&original, part, connection) {
            Ok(transaction) => created.push(transaction),
            Err(error) => {
                tracing::error!(
                    "split of transaction {transaction_id} failed inserting part {}: {error}",
                    applied + 1
                );
                return Err(Error::PartialSplit {
                    transaction_id,
                    applied,
                    total,
                });
            }
        }
    }

    if let Err(error) = core::delete_transaction(transaction_id, connection) {
        tracing::error!(
            "split of transaction {transaction_id} failed deleting the original: {error}"
        );
        return Err(Error::PartialSplit {
            transaction_id,
            applied: parts.len(),
            total,
        });
    }

    Ok(created)
}

fn insert_part(
    original: &Transaction,
    part: &SplitPart,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "INSERT INTO \"transaction\" (fit_id, amt, kind, date, name, category, account, owner)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, fit_id, amt, kind, date, name, category, account, owner;",
        )?
        .query_row(
            (
                &original.fit_id,
                part.amt,
                TransactionKind::from_signed_amount(part.amt).as_str(),
                original.date,
                &original.name,
                part.category,
                original.account,
                original.owner,
            ),
            core::map_transaction_row,
        )
        .map_err(|error| error.into())
}
