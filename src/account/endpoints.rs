//! Route handlers for the account endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, AccountInput, core},
    database_id::{AccountId, OwnerId},
    pagination::{PageQuery, PagedResults, PaginationConfig},
};

/// The state needed by the account route handlers.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how list endpoints page data.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// A route handler for creating or updating an account.
pub async fn upsert_account_endpoint(
    State(state): State<AccountState>,
    Json(input): Json<AccountInput>,
) -> Result<Json<Account>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::upsert_account(input, &connection).map(Json)
}

/// A route handler for retrieving a single account.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_account(account_id, &connection).map(Json)
}

/// A route handler for listing an owner's accounts.
pub async fn get_accounts_by_owner_endpoint(
    State(state): State<AccountState>,
    Path(owner_id): Path<OwnerId>,
    Query(page_query): Query<PageQuery>,
) -> Result<Json<PagedResults<Account>>, Error> {
    let (page, page_size) = page_query.resolve(&state.pagination_config);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_accounts_by_owner(owner_id, page, page_size, &connection).map(Json)
}

/// A route handler for deleting an account.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::delete_account(account_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
