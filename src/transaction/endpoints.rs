//! Route handlers for the transaction endpoints.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

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
    database_id::{CategoryId, OwnerId, TransactionId},
    month::first_of_month,
    pagination::{PageQuery, PagedResults, PaginationConfig},
    transaction::{
        ImportResult, SplitPart, Transaction, TransactionFilter, TransactionInput, core,
        import::import_transactions, split::split_transaction,
    },
};

/// The state needed by the transaction route handlers.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The ids of the reserved categories seeded at start up.
    pub reserved_categories: ReservedCategories,
    /// The config that controls how list endpoints page data.
    pub pagination_config: PaginationConfig,
    /// The directory the importer reads statement files from.
    pub import_dir: PathBuf,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            reserved_categories: state.reserved_categories,
            pagination_config: state.pagination_config.clone(),
            import_dir: state.import_dir.clone(),
        }
    }
}

/// A route handler for creating or updating a transaction.
pub async fn upsert_transaction_endpoint(
    State(state): State<TransactionState>,
    Json(input): Json<TransactionInput>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::persist_transaction(input, &state.reserved_categories, &connection).map(Json)
}

/// A route handler for retrieving a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_transaction(transaction_id, &connection).map(Json)
}

/// A route handler for deleting a transaction.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::delete_transaction(transaction_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// The query parameters accepted by the by-owner transaction listing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    /// The 1-based page to return.
    pub page: Option<u64>,
    /// The number of results per page.
    pub page_size: Option<u64>,
    /// Limit results to one calendar year (requires `month`).
    pub year: Option<i32>,
    /// Limit results to one calendar month (requires `year`).
    pub month: Option<u8>,
    /// Limit results to one category.
    pub category: Option<CategoryId>,
}

/// A route handler for listing an owner's transactions.
pub async fn get_transactions_by_owner_endpoint(
    State(state): State<TransactionState>,
    Path(owner_id): Path<OwnerId>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<PagedResults<Transaction>>, Error> {
    let (page, page_size) = PageQuery {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve(&state.pagination_config);

    let month = match (query.year, query.month) {
        (Some(year), Some(month)) => Some(first_of_month(year, month)?),
        (None, None) => None,
        _ => {
            return Err(Error::Validation(
                "year and month must be supplied together".to_owned(),
            ));
        }
    };

    let filter = TransactionFilter {
        month,
        category: query.category,
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_transactions_by_owner(owner_id, filter, page, page_size, &connection).map(Json)
}

/// A route handler for retrieving an owner's earliest transaction.
pub async fn get_oldest_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(owner_id): Path<OwnerId>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_oldest_transaction(owner_id, &connection).map(Json)
}

/// A route handler for splitting a transaction into parts.
pub async fn split_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
    Json(parts): Json<Vec<SplitPart>>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    split_transaction(transaction_id, &parts, &connection).map(Json)
}

/// A route handler for importing the statement files waiting in the
/// import inbox.
pub async fn import_transactions_endpoint(
    State(state): State<TransactionState>,
    Path(owner_id): Path<OwnerId>,
) -> Result<Json<ImportResult>, Error> {
    let start_time = std::time::Instant::now();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    let result = import_transactions(
        owner_id,
        &state.import_dir,
        &state.reserved_categories,
        &connection,
    )
    .inspect_err(|error| {
        tracing::error!(
            "import for owner {owner_id} failed after {:.2}ms: {error}",
            start_time.elapsed().as_millis()
        );
    })?;

    Ok(Json(result))
}
