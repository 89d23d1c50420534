#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Query parameter definitions for the record store.
//!
//! These types describe *what* to read from the violation record
//! collection. Every store backend interprets them identically, and every
//! query implicitly excludes soft-deleted records.

use chrono::NaiveDate;
use geopark_tuban_models::{RectifyStatus, YesNo};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub from: NaiveDate,
    /// Last day included.
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a new inclusive range.
    #[must_use]
    pub const fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Returns `true` if `date` falls within the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Predicates over the violation record collection. All set predicates
/// are combined with AND; an empty filter matches every live record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Exact rectification status.
    pub rectify_status: Option<RectifyStatus>,
    /// Rectification status must be one of these (ignored when empty).
    pub rectify_status_in: Vec<RectifyStatus>,
    /// Close-out flag.
    pub is_closed: Option<YesNo>,
    /// Rectification deadline strictly before this date.
    pub deadline_before: Option<NaiveDate>,
    /// Exact functional zone.
    pub func_zone: Option<String>,
    /// Exact problem type.
    pub problem_type: Option<String>,
    /// Record must be linked to this event.
    pub event_id: Option<i64>,
    /// Both longitude and latitude must be present.
    pub has_coordinates: bool,
    /// Discovery date within this range.
    pub discovered_between: Option<DateRange>,
    /// Verification date within this range.
    pub verified_between: Option<DateRange>,
}

impl RecordFilter {
    /// A filter matching every live record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Records still open (not started or in progress) whose deadline has
    /// passed as of `today`.
    #[must_use]
    pub fn overdue(today: NaiveDate) -> Self {
        Self {
            rectify_status_in: vec![RectifyStatus::NotStarted, RectifyStatus::InProgress],
            deadline_before: Some(today),
            ..Self::default()
        }
    }

    /// Restricts to an exact rectification status.
    #[must_use]
    pub fn with_status(mut self, status: RectifyStatus) -> Self {
        self.rectify_status = Some(status);
        self
    }

    /// Restricts to records with the given close-out flag.
    #[must_use]
    pub const fn with_closed(mut self, closed: YesNo) -> Self {
        self.is_closed = Some(closed);
        self
    }

    /// Restricts to records with both coordinates present.
    #[must_use]
    pub const fn geolocated(mut self) -> Self {
        self.has_coordinates = true;
        self
    }
}

/// Record field used as a group-by key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupField {
    /// Problem classification.
    ProblemType,
    /// Functional zone.
    FuncZone,
    /// Impact level.
    ImpactLevel,
    /// Rectification status label.
    RectifyStatus,
    /// Geopark name.
    ParkName,
    /// Discovery month, formatted `YYYY-MM`.
    DiscoverMonth,
    /// Verification month, formatted `YYYY-MM`.
    VerifyMonth,
}

/// One bucket of a group-by query. `key` is `None` when the field was null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRow {
    /// The grouped value.
    pub key: Option<String>,
    /// Number of records in the bucket.
    pub count: u64,
}

/// Ordering for full-row fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrder {
    /// Ascending primary key.
    #[default]
    Id,
    /// Soonest deadline first; records without a deadline last, ties by id.
    DeadlineAsc,
}
