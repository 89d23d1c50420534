#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregate statistics over the violation record ledger.
//!
//! Each report in [`reports`] and [`map`] is a function of store state, its
//! parameters and an explicit `today`, reading only through the
//! [`RecordStore`](geopark_database::RecordStore) trait. [`ReportService`]
//! puts the process-wide TTL cache in front of them.

pub mod map;
pub mod months;
pub mod reports;
pub mod service;

pub use service::{ReportConfig, ReportService};

use geopark_database::StoreError;
use thiserror::Error;

/// Errors that can occur while computing a report.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A request parameter could not be interpreted. Raised before any
    /// store query runs.
    #[error("Invalid parameter {name}: {value:?}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// Record store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
