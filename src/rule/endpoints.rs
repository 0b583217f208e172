//! Route handlers for the rule endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::ReservedCategories,
    database_id::{OwnerId, RuleId},
    pagination::{PageQuery, PagedResults, PaginationConfig},
    rule::{
        ApplyMode, Rule, RuleApplication, RuleInput, apply_rules_to_transactions, core,
    },
};

/// The state needed by the rule route handlers.
#[derive(Debug, Clone)]
pub struct RuleState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The ids of the reserved categories seeded at start up.
    pub reserved_categories: ReservedCategories,
    /// The config that controls how list endpoints page data.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for RuleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            reserved_categories: state.reserved_categories,
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// A route handler for creating or updating a rule.
pub async fn upsert_rule_endpoint(
    State(state): State<RuleState>,
    Json(input): Json<RuleInput>,
) -> Result<Json<Rule>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::upsert_rule(input, &connection).map(Json)
}

/// A route handler for retrieving a single rule.
pub async fn get_rule_endpoint(
    State(state): State<RuleState>,
    Path(rule_id): Path<RuleId>,
) -> Result<Json<Rule>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_rule(rule_id, &connection).map(Json)
}

/// A route handler for listing an owner's rules.
pub async fn get_rules_by_owner_endpoint(
    State(state): State<RuleState>,
    Path(owner_id): Path<OwnerId>,
    Query(page_query): Query<PageQuery>,
) -> Result<Json<PagedResults<Rule>>, Error> {
    let (page, page_size) = page_query.resolve(&state.pagination_config);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_rules_by_owner(owner_id, page, page_size, &connection).map(Json)
}

/// A route handler for deleting a rule.
pub async fn delete_rule_endpoint(
    State(state): State<RuleState>,
    Path(rule_id): Path<RuleId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::delete_rule(rule_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// The query parameters accepted by the apply-rules endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRulesQuery {
    /// When true, transactions that already have a category are left
    /// alone.
    pub uncategorized_only: Option<bool>,
}

/// A route handler for applying an owner's rules to their transactions.
pub async fn apply_rules_endpoint(
    State(state): State<RuleState>,
    Path(owner_id): Path<OwnerId>,
    Query(query): Query<ApplyRulesQuery>,
) -> Result<Json<RuleApplication>, Error> {
    let start_time = std::time::Instant::now();
    let mode = if query.uncategorized_only.unwrap_or(false) {
        ApplyMode::UncategorizedOnly
    } else {
        ApplyMode::All
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    let result =
        apply_rules_to_transactions(owner_id, mode, &state.reserved_categories, &connection)
            .inspect_err(|error| {
                tracing::error!(
                    "applying rules for owner {owner_id} failed after {:.2}ms: {error}",
                    start_time.elapsed().as_millis()
                );
            })?;

    tracing::info!(
        "applied rules for owner {owner_id} in {:.2}ms: {} transactions matched, {} categories applied",
        start_time.elapsed().as_millis(),
        result.transactions_matched,
        result.categories_applied
    );

    Ok(Json(result))
}
