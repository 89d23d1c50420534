//! Database connection utilities.

use std::path::PathBuf;

use crate::{SqliteStore, StoreError};

/// Default path for the ledger database.
pub const DEFAULT_DB_PATH: &str = "data/tubans.db";

/// Resolves the database path from the `DATABASE_PATH` environment
/// variable, falling back to [`DEFAULT_DB_PATH`].
#[must_use]
pub fn db_path_from_env() -> PathBuf {
    std::env::var("DATABASE_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Opens the ledger database named by `DATABASE_PATH`.
///
/// # Errors
///
/// Returns [`StoreError`] if the database cannot be opened or the schema
/// cannot be created.
pub async fn connect_from_env() -> Result<SqliteStore, StoreError> {
    let path = db_path_from_env();
    log::info!("Opening ledger database at {}", path.display());
    SqliteStore::open(&path).await
}
