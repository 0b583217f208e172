//! Implements a struct that holds the state of the REST server.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{
    Error, category::ReservedCategories, db::initialize, pagination::PaginationConfig,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The config that controls how list endpoints page data.
    pub pagination_config: PaginationConfig,

    /// The ids of the reserved categories seeded at start up.
    pub reserved_categories: ReservedCategories,

    /// The directory the transaction importer reads statement files
    /// from.
    pub import_dir: PathBuf,

    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables
    /// for the domain models and seeding the reserved category rows.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        pagination_config: PaginationConfig,
        reserved_categories: ReservedCategories,
        import_dir: PathBuf,
    ) -> Result<Self, Error> {
        initialize(&db_connection, &reserved_categories)?;

        Ok(Self {
            pagination_config,
            reserved_categories,
            import_dir,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
