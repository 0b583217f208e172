//! Core rule model and database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{CategoryId, OwnerId, RuleId},
    money::to_cents,
    pagination::{PagedResults, page_offset},
};

/// Error returned when an amount filter string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid amount filter; expected an amount with an optional <, <=, > or >= prefix")]
pub struct ParseAmountFilterError(String);

/// A comparison a rule makes against a transaction's amount.
///
/// The stored string form is an optional operator (`<`, `<=`, `>`, `>=`)
/// followed by a decimal amount; a bare amount means equality. Equality
/// compares whole cents. All comparisons are made against the absolute
/// amount, since rule authors write positive numbers while debits are
/// stored negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountFilter {
    /// Matches when the amounts agree to the cent.
    Equals(f64),
    /// Matches amounts strictly below the limit.
    Under(f64),
    /// Matches amounts at or below the limit.
    AtMost(f64),
    /// Matches amounts strictly above the limit.
    Over(f64),
    /// Matches amounts at or above the limit.
    AtLeast(f64),
}

impl AmountFilter {
    /// Whether `amount` satisfies the comparison.
    pub fn matches(&self, amount: f64) -> bool {
        let amount = amount.abs();

        match *self {
            Self::Equals(want) => to_cents(amount) == to_cents(want.abs()),
            Self::Under(limit) => amount < limit,
            Self::AtMost(limit) => amount <= limit,
            Self::Over(limit) => amount > limit,
            Self::AtLeast(limit) => amount >= limit,
        }
    }
}

impl FromStr for AmountFilter {
    type Err = ParseAmountFilterError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let parse_error = || ParseAmountFilterError(text.to_owned());

        let (variant, amount_text): (fn(f64) -> Self, &str) =
            if let Some(rest) = text.strip_prefix("<=") {
                (Self::AtMost, rest)
            } else if let Some(rest) = text.strip_prefix(">=") {
                (Self::AtLeast, rest)
            } else if let Some(rest) = text.strip_prefix('<') {
                (Self::Under, rest)
            } else if let Some(rest) = text.strip_prefix('>') {
                (Self::Over, rest)
            } else {
                (Self::Equals, text)
            };

        let amount: f64 = amount_text.trim().parse().map_err(|_| parse_error())?;

        if !amount.is_finite() {
            return Err(parse_error());
        }

        Ok(variant(amount))
    }
}

impl Display for AmountFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equals(amount) => write!(f, "{amount}"),
            Self::Under(amount) => write!(f, "<{amount}"),
            Self::AtMost(amount) => write!(f, "<={amount}"),
            Self::Over(amount) => write!(f, ">{amount}"),
            Self::AtLeast(amount) => write!(f, ">={amount}"),
        }
    }
}

impl Serialize for AmountFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AmountFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A rule that assigns a category to matching transactions.
///
/// A rule matches a transaction when every one of its non-null predicates
/// holds. A rule with neither predicate never matches anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// The ID of the rule.
    pub id: RuleId,
    /// The evaluation order: lower numbers are evaluated first, and ties
    /// break by ascending rule id.
    pub priority: i64,
    /// The category a matching transaction is assigned.
    pub result_category: CategoryId,
    /// The owner namespace the rule belongs to.
    pub owner: OwnerId,
    /// Case-insensitive substring the transaction name must contain.
    pub match_name: Option<String>,
    /// Comparison the transaction amount must satisfy.
    pub match_amt: Option<AmountFilter>,
}

/// The fields accepted when creating or updating a rule.
///
/// `match_amt` arrives as the raw string form and is validated here,
/// before anything is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInput {
    /// The ID of the rule to update, or `None` to create one.
    pub id: Option<RuleId>,
    /// The evaluation order: lower numbers are evaluated first.
    pub priority: i64,
    /// The category a matching transaction is assigned.
    pub result_category: CategoryId,
    /// The owner namespace the rule belongs to.
    pub owner: OwnerId,
    /// Case-insensitive substring the transaction name must contain.
    pub match_name: Option<String>,
    /// Comparison the transaction amount must satisfy, in string form.
    pub match_amt: Option<String>,
}

/// Create the rule table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_rule_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS rule (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                priority INTEGER NOT NULL,
                result_category INTEGER NOT NULL,
                owner INTEGER NOT NULL,
                match_name TEXT,
                match_amt TEXT,
                FOREIGN KEY(result_category) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
            );",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_rule_owner ON rule(owner);",
        (),
    )?;

    Ok(())
}

/// Create or update a rule.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the priority is below 1 or `match_amt` does
///   not parse,
/// - [Error::InvalidCategory] if `result_category` does not refer to a
///   valid category,
/// - [Error::UpdateMissingRule] if the id refers to no rule,
/// - or [Error::Sql] if there is some other SQL error.
pub fn upsert_rule(input: RuleInput, connection: &Connection) -> Result<Rule, Error> {
    if input.priority < 1 {
        return Err(Error::Validation("priority must be at least 1".to_owned()));
    }

    let match_amt = input
        .match_amt
        .as_deref()
        .map(AmountFilter::from_str)
        .transpose()
        .map_err(|error| Error::Validation(error.to_string()))?;

    let match_name = input
        .match_name
        .map(|pattern| pattern.trim().to_owned())
        .filter(|pattern| !pattern.is_empty());

    let map_foreign_key = |error: rusqlite::Error| match error {
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
            Error::InvalidCategory(Some(input.result_category))
        }
        error => error.into(),
    };

    match input.id {
        None => {
            connection
                .execute(
                    "INSERT INTO rule (priority, result_category, owner, match_name, match_amt)
                     VALUES (?1, ?2, ?3, ?4, ?5);",
                    (
                        input.priority,
                        input.result_category,
                        input.owner,
                        &match_name,
                        match_amt.map(|filter| filter.to_string()),
                    ),
                )
                .map_err(map_foreign_key)?;

            let id = connection.last_insert_rowid();

            Ok(Rule {
                id,
                priority: input.priority,
                result_category: input.result_category,
                owner: input.owner,
                match_name,
                match_amt,
            })
        }
        Some(id) => {
            let rows_affected = connection
                .execute(
                    "UPDATE rule
                     SET priority = ?1, result_category = ?2, match_name = ?3, match_amt = ?4
                     WHERE id = ?5 AND owner = ?6;",
                    (
                        input.priority,
                        input.result_category,
                        &match_name,
                        match_amt.map(|filter| filter.to_string()),
                        id,
                        input.owner,
                    ),
                )
                .map_err(map_foreign_key)?;

            if rows_affected == 0 {
                return Err(Error::UpdateMissingRule);
            }

            Ok(Rule {
                id,
                priority: input.priority,
                result_category: input.result_category,
                owner: input.owner,
                match_name,
                match_amt,
            })
        }
    }
}

/// Retrieve a rule by `rule_id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if the id refers to no
/// rule, or [Error::Sql] if there is some other SQL error.
pub fn get_rule(rule_id: RuleId, connection: &Connection) -> Result<Rule, Error> {
    connection
        .prepare(
            "SELECT id, priority, result_category, owner, match_name, match_amt
             FROM rule WHERE id = :id;",
        )?
        .query_one(&[(":id", &rule_id)], map_rule_row)
        .map_err(|error| error.into())
}

/// Retrieve a page of an owner's rules.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_rules_by_owner(
    owner: OwnerId,
    page: u64,
    page_size: u64,
    connection: &Connection,
) -> Result<PagedResults<Rule>, Error> {
    let total_hit_count: u64 = connection.query_row(
        "SELECT COUNT(id) FROM rule WHERE owner = ?1;",
        [owner],
        |row| row.get(0),
    )?;

    let results = connection
        .prepare(
            "SELECT id, priority, result_category, owner, match_name, match_amt
             FROM rule WHERE owner = ?1
             ORDER BY priority ASC, id ASC
             LIMIT ?2 OFFSET ?3;",
        )?
        .query_map(
            (owner, page_size, page_offset(page, page_size)),
            map_rule_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PagedResults::new(results, total_hit_count, page, page_size))
}

/// Retrieve an owner's rules in evaluation order.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_rules_for_matching(owner: OwnerId, connection: &Connection) -> Result<Vec<Rule>, Error> {
    connection
        // Ascending priority; ties break deterministically by rule id.
        .prepare(
            "SELECT id, priority, result_category, owner, match_name, match_amt
             FROM rule WHERE owner = ?1
             ORDER BY priority ASC, id ASC;",
        )?
        .query_map([owner], map_rule_row)?
        .map(|maybe_rule| maybe_rule.map_err(|error| error.into()))
        .collect()
}

/// Delete a rule by ID.
///
/// # Errors
/// This function will return a [Error::DeleteMissingRule] if the id
/// refers to no rule, or [Error::Sql] if there is some other SQL error.
pub fn delete_rule(rule_id: RuleId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM rule WHERE id = ?1;", [rule_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRule);
    }

    Ok(())
}

fn map_rule_row(row: &Row) -> Result<Rule, rusqlite::Error> {
    let match_amt = row
        .get::<usize, Option<String>>(5)?
        .map(|text| {
            text.parse::<AmountFilter>().map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error))
            })
        })
        .transpose()?;

    Ok(Rule {
        id: row.get(0)?,
        priority: row.get(1)?,
        result_category: row.get(2)?,
        owner: row.get(3)?,
        match_name: row.get(4)?,
        match_amt,
    })
}


#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{CategoryInput, ReservedCategories, upsert_category},
        db::initialize,
        rule::{AmountFilter, Rule, RuleInput},
    };

    use super::{delete_rule, get_rule, get_rules_by_owner, get_rules_for_matching, upsert_rule};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection, &ReservedCategories::default()).unwrap();
        connection
    }

    fn create_category(name: &str, connection: &Connection) -> i64 {
        upsert_category(
            CategoryInput {
                id: None,
                name: name.to_owned(),
                parent_category: None,
                owner: 1,
            },
            &ReservedCategories::default(),
            connection,
        )
        .unwrap()
        .id
    }

    fn new_rule(priority: i64, category: i64, match_name: Option<&str>) -> RuleInput {
        RuleInput {
            id: None,
            priority,
            result_category: category,
            owner: 1,
            match_name: match_name.map(str::to_owned),
            match_amt: None,
        }
    }

    #[test]
    fn create_rule_succeeds() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);

        let rule = upsert_rule(new_rule(1, category, Some("starbucks")), &connection).unwrap();

        assert!(rule.id > 0);
        assert_eq!(get_rule(rule.id, &connection), Ok(rule));
    }

    #[test]
    fn create_rule_parses_amount_filter() {
        let connection = get_test_connection();
        let category = create_category("Rent", &connection);

        let rule = upsert_rule(
            RuleInput {
                match_amt: Some(">=1200".to_owned()),
                ..new_rule(1, category, None)
            },
            &connection,
        )
        .unwrap();

        assert_eq!(rule.match_amt, Some(AmountFilter::AtLeast(1200.0)));

        let stored = get_rule(rule.id, &connection).unwrap();
        assert_eq!(stored.match_amt, Some(AmountFilter::AtLeast(1200.0)));
    }

    #[test]
    fn create_rule_rejects_invalid_amount_filter() {
        let connection = get_test_connection();
        let category = create_category("Rent", &connection);

        let result = upsert_rule(
            RuleInput {
                match_amt: Some("about twelve".to_owned()),
                ..new_rule(1, category, None)
            },
            &connection,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn create_rule_rejects_priority_below_one() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);

        let result = upsert_rule(new_rule(0, category, Some("starbucks")), &connection);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn create_rule_rejects_unknown_category() {
        let connection = get_test_connection();

        let result = upsert_rule(new_rule(1, 999, Some("starbucks")), &connection);

        assert_eq!(result, Err(Error::InvalidCategory(Some(999))));
    }

    #[test]
    fn blank_match_name_is_stored_as_null() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);

        let rule = upsert_rule(new_rule(1, category, Some("   ")), &connection).unwrap();

        assert_eq!(rule.match_name, None);
    }

    #[test]
    fn update_rule_succeeds() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);
        let other_category = create_category("Dining", &connection);
        let rule = upsert_rule(new_rule(5, category, Some("starbucks")), &connection).unwrap();

        let updated = upsert_rule(
            RuleInput {
                id: Some(rule.id),
                priority: 2,
                result_category: other_category,
                owner: 1,
                match_name: Some("cafe".to_owned()),
                match_amt: None,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.priority, 2);
        assert_eq!(get_rule(rule.id, &connection), Ok(updated));
    }

    #[test]
    fn update_missing_rule_fails() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);

        let result = upsert_rule(
            RuleInput {
                id: Some(999),
                ..new_rule(1, category, Some("starbucks"))
            },
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingRule));
    }

    #[test]
    fn delete_rule_succeeds() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);
        let rule = upsert_rule(new_rule(1, category, Some("starbucks")), &connection).unwrap();

        delete_rule(rule.id, &connection).unwrap();

        assert_eq!(get_rule(rule.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_rule_fails() {
        let connection = get_test_connection();

        assert_eq!(delete_rule(999, &connection), Err(Error::DeleteMissingRule));
    }

    #[test]
    fn rules_for_matching_are_ordered_by_priority_then_id() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);
        let low_priority = upsert_rule(new_rule(2, category, Some("b")), &connection).unwrap();
        let tie_created_first = upsert_rule(new_rule(1, category, Some("c")), &connection).unwrap();
        let tie_created_second = upsert_rule(new_rule(1, category, Some("a")), &connection).unwrap();

        let rules = get_rules_for_matching(1, &connection).unwrap();

        let ids: Vec<_> = rules.iter().map(|rule| rule.id).collect();
        assert_eq!(
            ids,
            vec![tie_created_first.id, tie_created_second.id, low_priority.id]
        );
        // Within the same priority, the earlier-created rule comes first.
        assert!(tie_created_first.id < tie_created_second.id);
    }

    #[test]
    fn rules_by_owner_is_scoped_and_paged() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);
        for priority in 1..=5 {
            upsert_rule(new_rule(priority, category, Some("a")), &connection).unwrap();
        }
        upsert_rule(
            RuleInput {
                owner: 2,
                ..new_rule(1, category, Some("other owner"))
            },
            &connection,
        )
        .unwrap();

        let page = get_rules_by_owner(1, 1, 3, &connection).unwrap();

        assert_eq!(page.total_hit_count, 5);
        assert_eq!(page.hit_count, 3);
        assert!(page.has_next);
        assert!(page.results.iter().all(|rule: &Rule| rule.owner == 1));
    }

    #[test]
    fn deleting_a_category_drops_its_rules() {
        let connection = get_test_connection();
        let category = create_category("Coffee", &connection);
        let rule = upsert_rule(new_rule(1, category, Some("starbucks")), &connection).unwrap();

        crate::category::delete_category(category, &ReservedCategories::default(), &connection)
            .unwrap();

        assert_eq!(get_rule(rule.id, &connection), Err(Error::NotFound));
    }
}
