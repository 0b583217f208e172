//! Route handlers for the budget endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    budget::{Budget, BudgetInput, BudgetReport, build_budget_report, core, is_active},
    category::{ReservedCategories, get_category_map_for_owner},
    database_id::{BudgetId, OwnerId},
    month::{first_of_month, month_end},
    transaction::get_transactions_in_range,
};

/// The state needed by the budget route handlers.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The ids of the reserved categories seeded at start up.
    pub reserved_categories: ReservedCategories,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            reserved_categories: state.reserved_categories,
        }
    }
}

/// A route handler for creating or updating a budget.
pub async fn upsert_budget_endpoint(
    State(state): State<BudgetState>,
    Json(input): Json<BudgetInput>,
) -> Result<Json<Budget>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::upsert_budget(input, &connection).map(Json)
}

/// A route handler for retrieving a single budget.
pub async fn get_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<BudgetId>,
) -> Result<Json<Budget>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_budget(budget_id, &connection).map(Json)
}

/// A route handler for deactivating a budget.
///
/// Budgets are never hard-deleted; this stamps the budget's inactive
/// date with the current month and returns the updated budget.
pub async fn deactivate_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<BudgetId>,
) -> Result<Json<Budget>, Error> {
    let today = OffsetDateTime::now_utc().date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::deactivate_budget(budget_id, today, &connection).map(Json)
}

/// A route handler for building an owner's budget report for one month.
pub async fn get_budget_report_endpoint(
    State(state): State<BudgetState>,
    Path((owner_id, year, month)): Path<(OwnerId, i32, u8)>,
) -> Result<Json<BudgetReport>, Error> {
    let target_month = first_of_month(year, month)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    let budgets = core::get_budgets_by_owner(owner_id, &connection)?;
    let categories = get_category_map_for_owner(owner_id, &connection)?;

    // Accumulation walks each budget's full history, so the transaction
    // snapshot starts at the earliest active creation date.
    let earliest = budgets
        .iter()
        .filter(|budget| is_active(budget, target_month))
        .map(|budget| budget.create_date)
        .min()
        .unwrap_or(target_month);
    let transactions = get_transactions_in_range(
        owner_id,
        earliest,
        month_end(target_month),
        &connection,
    )?;

    Ok(Json(build_budget_report(
        owner_id,
        target_month,
        &budgets,
        &transactions,
        &categories,
        &state.reserved_categories,
    )))
}
