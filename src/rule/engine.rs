//! Applies an owner's rule set to their transactions.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    category::{ReservedCategories, get_category_ids},
    database_id::{CategoryId, OwnerId, TransactionId},
    rule::{Rule, core::get_rules_for_matching},
};

/// Describes which transactions a rule application pass should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Re-evaluate every transaction, replacing existing categories.
    All,
    /// Only consider transactions still in the reserved Uncategorized
    /// category.
    UncategorizedOnly,
}

/// Statistics from one rule application pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleApplication {
    /// Number of transactions that matched a rule and were updated.
    pub transactions_matched: usize,
    /// Number of distinct categories that were applied.
    pub categories_applied: usize,
}

impl RuleApplication {
    /// A result with nothing processed and nothing applied.
    pub fn empty() -> Self {
        Self {
            transactions_matched: 0,
            categories_applied: 0,
        }
    }
}

/// The first category assigned by a matching rule, if any.
///
/// `rules` must already be in evaluation order (ascending priority, ties
/// by id), which is the order [get_rules_for_matching] returns.
pub fn match_category(rules: &[Rule], name: &str, amount: f64) -> Option<CategoryId> {
    rules
        .iter()
        .find(|rule| rule_matches(rule, name, amount))
        .map(|rule| rule.result_category)
}

fn rule_matches(rule: &Rule, name: &str, amount: f64) -> bool {
    if rule.match_name.is_none() && rule.match_amt.is_none() {
        return false;
    }

    let name_matches = rule
        .match_name
        .as_ref()
        .is_none_or(|pattern| name.to_lowercase().contains(&pattern.to_lowercase()));

    let amount_matches = rule.match_amt.is_none_or(|filter| filter.matches(amount));

    name_matches && amount_matches
}

/// Apply an owner's rules to their transactions, persisting the new
/// categories.
///
/// Rules whose result category no longer exists are skipped with a
/// warning rather than failing the batch. Re-running with the same rules
/// and transactions yields the same final categories.
///
/// # Errors
/// Returns an error if there are database errors during the operation.
pub fn apply_rules_to_transactions(
    owner: OwnerId,
    mode: ApplyMode,
    reserved: &ReservedCategories,
    connection: &Connection,
) -> Result<RuleApplication, Error> {
    let rules = valid_rules_for_owner(owner, connection)?;
    if rules.is_empty() {
        return Ok(RuleApplication::empty());
    }

    let candidates = get_candidate_transactions(owner, mode, reserved, connection)?;
    if candidates.is_empty() {
        return Ok(RuleApplication::empty());
    }

    let mut updates: Vec<(TransactionId, CategoryId)> = Vec::new();
    let mut applied_categories = HashSet::new();

    for (transaction_id, name, amount) in &candidates {
        if let Some(category) = match_category(&rules, name, *amount) {
            updates.push((*transaction_id, category));
            applied_categories.insert(category);
        }
    }

    let transactions_matched = updates.len();
    batch_set_transaction_categories(updates, connection)?;

    Ok(RuleApplication {
        transactions_matched,
        categories_applied: applied_categories.len(),
    })
}

/// The owner's rules in evaluation order, minus any whose result category
/// no longer exists. Dangling rules are skipped with a warning rather
/// than failing the batch.
pub(crate) fn valid_rules_for_owner(
    owner: OwnerId,
    connection: &Connection,
) -> Result<Vec<Rule>, Error> {
    let known_categories = get_category_ids(owner, connection)?;

    Ok(get_rules_for_matching(owner, connection)?
        .into_iter()
        .filter(|rule| {
            let known = known_categories.contains(&rule.result_category);
            if !known {
                tracing::warn!(
                    "skipping rule {} because category {} no longer exists",
                    rule.id,
                    rule.result_category
                );
            }
            known
        })
        .collect())
}

fn get_candidate_transactions(
    owner: OwnerId,
    mode: ApplyMode,
    reserved: &ReservedCategories,
    connection: &Connection,
) -> Result<Vec<(TransactionId, String, f64)>, Error> {
    match mode {
        ApplyMode::All => connection
            .prepare("SELECT id, name, amt FROM \"transaction\" WHERE owner = ?1;")?
            .query_map([owner], map_candidate_row)?
            .map(|maybe_row| maybe_row.map_err(Error::from))
            .collect(),
        ApplyMode::UncategorizedOnly => connection
            .prepare("SELECT id, name, amt FROM \"transaction\" WHERE owner = ?1 AND category = ?2;")?
            .query_map((owner, reserved.uncategorized), map_candidate_row)?
            .map(|maybe_row| maybe_row.map_err(Error::from))
            .collect(),
    }
}

fn map_candidate_row(
    row: &rusqlite::Row,
) -> Result<(TransactionId, String, f64), rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

/// Batch set categories for multiple transactions, replacing any existing
/// categories.
fn batch_set_transaction_categories(
    transaction_category_pairs: Vec<(TransactionId, CategoryId)>,
    connection: &Connection,
) -> Result<(), Error> {
    if transaction_category_pairs.is_empty() {
        return Ok(());
    }

    let mut statement =
        connection.prepare("UPDATE \"transaction\" SET category = ?2 WHERE id = ?1;")?;

    for (transaction_id, category) in &transaction_category_pairs {
        statement
            .execute((transaction_id, category))
            .map_err(|error| match error {
                // Code 787 occurs when a FOREIGN KEY constraint failed.
                rusqlite::Error::SqliteFailure(sql_error, Some(_))
                    if sql_error.extended_code == 787 =>
                {
                    Error::InvalidCategory(Some(*category))
                }
                error => error.into(),
            })?;
    }

    Ok(())
}
