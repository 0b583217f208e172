//! Rule management and the auto-categorization engine.
//!
//! A rule assigns a category to transactions whose name or amount matches
//! its predicates. Rules are evaluated in ascending priority order and the
//! first match wins. This module contains:
//! - The `Rule` model with its typed amount predicate
//! - Database functions for storing and querying rules
//! - The engine that applies a rule set to transactions
//! - Route handlers for the rule endpoints

mod core;
mod endpoints;
mod engine;

pub use core::{
    AmountFilter, ParseAmountFilterError, Rule, RuleInput, create_rule_table, delete_rule,
    get_rule, get_rules_by_owner, get_rules_for_matching, upsert_rule,
};
pub use endpoints::{
    RuleState, apply_rules_endpoint, delete_rule_endpoint, get_rule_endpoint,
    get_rules_by_owner_endpoint, upsert_rule_endpoint,
};
pub use engine::{ApplyMode, RuleApplication, apply_rules_to_transactions, match_category};

pub(crate) use engine::valid_rules_for_owner;
