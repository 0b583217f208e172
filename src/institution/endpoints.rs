//! Route handlers for the institution endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::InstitutionId,
    institution::{Institution, InstitutionInput, core},
    pagination::{PageQuery, PagedResults, PaginationConfig},
};

/// The state needed by the institution route handlers.
#[derive(Debug, Clone)]
pub struct InstitutionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how list endpoints page data.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for InstitutionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// A route handler for creating or updating an institution.
pub async fn upsert_institution_endpoint(
    State(state): State<InstitutionState>,
    Json(input): Json<InstitutionInput>,
) -> Result<Json<Institution>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::upsert_institution(input, &connection).map(Json)
}

/// A route handler for retrieving a single institution.
pub async fn get_institution_endpoint(
    State(state): State<InstitutionState>,
    Path(institution_id): Path<InstitutionId>,
) -> Result<Json<Institution>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_institution(institution_id, &connection).map(Json)
}

/// A route handler for listing institutions.
pub async fn get_institutions_endpoint(
    State(state): State<InstitutionState>,
    Query(page_query): Query<PageQuery>,
) -> Result<Json<PagedResults<Institution>>, Error> {
    let (page, page_size) = page_query.resolve(&state.pagination_config);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_institutions(page, page_size, &connection).map(Json)
}

/// A route handler for deleting an institution.
pub async fn delete_institution_endpoint(
    State(state): State<InstitutionState>,
    Path(institution_id): Path<InstitutionId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::delete_institution(institution_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
