//! Route handlers for the trend endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    category::get_category,
    database_id::{CategoryId, OwnerId},
    month::{month_end, month_start, previous_month},
    transaction::get_transactions_in_range,
    trend::{
        CategorySpendingByMonth, NetIncomeByMonth, summarize_category_spending,
        summarize_net_income,
    },
};

/// The state needed by the trend route handlers.
#[derive(Debug, Clone)]
pub struct TrendState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TrendState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The date-range query parameters accepted by the trend endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendQuery {
    /// The first day of the range; defaults to twelve months before the
    /// end, aligned to a month start.
    pub start_dt: Option<Date>,
    /// The last day of the range; defaults to today.
    pub end_dt: Option<Date>,
}

impl TrendQuery {
    fn resolve(self) -> (Date, Date) {
        let end = self.end_dt.unwrap_or_else(|| OffsetDateTime::now_utc().date());
        let start = self.start_dt.unwrap_or_else(|| {
            let mut month = month_start(end);
            for _ in 0..11 {
                month = previous_month(month);
            }
            month
        });

        (start, end)
    }
}

/// A route handler for the month-by-month net income trend.
pub async fn get_net_income_endpoint(
    State(state): State<TrendState>,
    Path(owner_id): Path<OwnerId>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<NetIncomeByMonth>>, Error> {
    let (start, end) = query.resolve();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    let transactions = get_transactions_in_range(owner_id, start, end, &connection)?;

    Ok(Json(summarize_net_income(&transactions)))
}

/// The query parameters accepted by the category spending endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpendQuery {
    /// The category to summarize.
    pub category: CategoryId,
    /// The first day of the range.
    pub start_dt: Option<Date>,
    /// The last day of the range.
    pub end_dt: Option<Date>,
}

/// A route handler for one category's month-by-month spending trend.
pub async fn get_category_spending_endpoint(
    State(state): State<TrendState>,
    Path(owner_id): Path<OwnerId>,
    Query(query): Query<CategorySpendQuery>,
) -> Result<Json<Vec<CategorySpendingByMonth>>, Error> {
    let (start, end) = TrendQuery {
        start_dt: query.start_dt,
        end_dt: query.end_dt,
    }
    .resolve();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    let category = get_category(query.category, &connection)?;
    let transactions =
        get_transactions_in_range(owner_id, start, month_end(end), &connection)?;

    Ok(Json(summarize_category_spending(
        &transactions,
        &category,
        start,
        end,
    )))
}
