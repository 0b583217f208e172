//! Route handlers for the category endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{
        Category, CategoryInput, PrimaryCategory, ReservedCategories,
        assemble_primary_categories, core,
    },
    database_id::{CategoryId, OwnerId},
    pagination::{PageQuery, PagedResults, PaginationConfig},
};

/// The state needed by the category route handlers.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The ids of the reserved categories seeded at start up.
    pub reserved_categories: ReservedCategories,
    /// The config that controls how list endpoints page data.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            reserved_categories: state.reserved_categories,
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// A route handler for creating or updating a category.
pub async fn upsert_category_endpoint(
    State(state): State<CategoryState>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::upsert_category(input, &state.reserved_categories, &connection).map(Json)
}

/// A route handler for retrieving a single category.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_category(category_id, &connection).map(Json)
}

/// A route handler for listing an owner's categories as a page of flat
/// rows.
pub async fn get_categories_by_owner_endpoint(
    State(state): State<CategoryState>,
    Path(owner_id): Path<OwnerId>,
    Query(page_query): Query<PageQuery>,
) -> Result<Json<PagedResults<Category>>, Error> {
    let (page, page_size) = page_query.resolve(&state.pagination_config);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::get_categories_by_owner(owner_id, page, page_size, &connection).map(Json)
}

/// A route handler for listing an owner's categories grouped into
/// primaries with their subcategories.
pub async fn get_primary_categories_endpoint(
    State(state): State<CategoryState>,
    Path(owner_id): Path<OwnerId>,
) -> Result<Json<Vec<PrimaryCategory>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    let categories = core::get_category_map_for_owner(owner_id, &connection)?
        .into_values()
        .collect::<Vec<_>>();
    let mut primaries = assemble_primary_categories(categories);
    primaries.sort_by(|a, b| a.name.cmp(&b.name));
    for primary in &mut primaries {
        primary.subcategories.sort_by(|a, b| a.name.cmp(&b.name));
    }

    Ok(Json(primaries))
}

/// A route handler for deleting a category.
///
/// The category's transactions move to the reserved Uncategorized
/// category and rules targeting it are dropped.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLock)?;

    core::delete_category(category_id, &state.reserved_categories, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
