#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record store access for violation records.
//!
//! Reporting reads the record collection only through the [`RecordStore`]
//! trait: count by predicate, group-by with count, and full-row fetch with
//! ordering. Two backends implement it:
//!
//! - [`sqlite::SqliteStore`]: the persisted store, via `switchy_database`
//!   raw parameterized SQL.
//! - [`memory::MemoryStore`]: an in-process collection used for fixtures
//!   and tests.
//!
//! Every query excludes soft-deleted records.

pub mod db;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use geopark_database_models::{GroupField, GroupRow, RecordFilter, RecordOrder};
use geopark_tuban_models::{Event, NewViolationRecord, ViolationRecord};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors that can occur while reading from or writing to the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The database could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// A record with the same ledger code already exists.
    #[error("Duplicate tuban code: {0}")]
    DuplicateCode(String),

    /// No event has this ID.
    #[error("Unknown event: {0}")]
    UnknownEvent(i64),
}

/// Read-only query capability over the violation record collection.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Counts live records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError>;

    /// Counts live records matching `filter` per distinct value of `field`.
    ///
    /// Null values form their own bucket with `key: None`. Buckets are
    /// ordered by key, nulls first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn group_count(
        &self,
        field: GroupField,
        filter: &RecordFilter,
    ) -> Result<Vec<GroupRow>, StoreError>;

    /// Fetches full rows of live records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn fetch(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
    ) -> Result<Vec<ViolationRecord>, StoreError>;

    /// Returns the active events, most recently issued first. Events
    /// without an issue date come last.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn active_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Returns the sorted, distinct, non-empty values of `field` across
    /// live records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn distinct_values(&self, field: GroupField) -> Result<Vec<String>, StoreError> {
        let rows = self.group_count(field, &RecordFilter::all()).await?;
        let mut values: Vec<String> = rows
            .into_iter()
            .filter_map(|row| row.key)
            .filter(|key| !key.trim().is_empty())
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }
}

/// Write access used by ledger import.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Returns `true` if any record, soft-deleted or not, already uses
    /// `tuban_code`. Ledger codes stay unique across deletions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn code_exists(&self, tuban_code: &str) -> Result<bool, StoreError>;

    /// Inserts a record and returns its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateCode`] if the code is taken, or another
    /// [`StoreError`] if the write fails.
    async fn insert(&self, record: &NewViolationRecord) -> Result<i64, StoreError>;
}
