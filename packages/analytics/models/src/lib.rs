#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report payload and parameter types for the statistics engine.
//!
//! Every payload is serialized with snake-case field names; these shapes
//! are what dashboard and map clients consume, so field names are part of
//! the public contract.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Headline counts over all live records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewStats {
    /// All live records.
    pub total_count: u64,
    /// Records not yet started.
    pub pending_count: u64,
    /// Records under rectification.
    pub in_progress_count: u64,
    /// Records closed out.
    pub closed_count: u64,
    /// Open records past their deadline.
    pub overdue_count: u64,
}

/// One bucket of a group-by breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    /// Bucket label; null and empty values share the unclassified label.
    pub name: String,
    /// Number of records in the bucket.
    pub value: u64,
}

/// Per-park counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkRanking {
    /// Geopark name.
    pub park_name: String,
    /// All live records in the park.
    pub total_count: u64,
    /// Records not yet started.
    pub pending_count: u64,
    /// Records under rectification.
    pub in_progress_count: u64,
    /// Records closed out.
    pub closed_count: u64,
}

/// Discovered and closed counts for the trailing twelve months.
///
/// The three vectors always have the same length, oldest month first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// Month keys, formatted `YYYY-MM`.
    pub months: Vec<String>,
    /// Records discovered in each month.
    pub discovered: Vec<u64>,
    /// Records verified and closed out in each month.
    pub closed: Vec<u64>,
}

/// One row of the overdue list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueItem {
    /// Record ID.
    pub id: i64,
    /// Ledger code.
    pub tuban_code: String,
    /// Geopark name.
    pub park_name: String,
    /// Facility name, `""` when absent.
    pub facility_name: String,
    /// Problem type, `""` when absent.
    pub problem_type: String,
    /// Rectification deadline.
    pub rectify_deadline: Option<NaiveDate>,
    /// Whole days past the deadline, never negative.
    pub overdue_days: i64,
}

/// Optional filters for the map feature collection, as received from the
/// query string.
///
/// Values are kept raw and validated when the report runs. Empty strings
/// mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapQueryParams {
    /// Exact functional zone.
    pub func_zone: Option<String>,
    /// Exact problem type.
    pub problem_type: Option<String>,
    /// Exact rectification status label.
    pub rectify_status: Option<String>,
    /// Event ID; must parse as an integer.
    pub event_id: Option<String>,
}

/// A GeoJSON feature collection of violation records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// One point feature per geolocated record.
    pub features: Vec<Feature>,
    /// Number of features.
    pub total: usize,
}

impl FeatureCollection {
    /// Wraps `features` in a collection.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            total: features.len(),
            features,
        }
    }
}

/// A GeoJSON point feature for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Point geometry.
    pub geometry: PointGeometry,
    /// Record attributes.
    pub properties: FeatureProperties,
}

/// A GeoJSON point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    /// Always `"Point"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

/// Attributes attached to each map feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: i64,
    pub tuban_code: String,
    pub park_name: String,
    pub func_zone: String,
    pub facility_name: String,
    pub problem_type: String,
    pub problem_desc: String,
    /// Display status text (may read `已销号` for closed records).
    pub rectify_status: String,
    pub is_closed: String,
    pub area: Option<f64>,
    /// Marker color for the display status.
    pub color: String,
    pub rectify_deadline: Option<NaiveDate>,
}

impl Feature {
    /// Builds a point feature at `(longitude, latitude)`.
    #[must_use]
    pub fn point(longitude: f64, latitude: f64, properties: FeatureProperties) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry: PointGeometry {
                kind: "Point".to_string(),
                coordinates: [longitude, latitude],
            },
            properties,
        }
    }
}

/// Status counts over geolocated records, shown next to the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub closed: u64,
}

/// Values for the map and list filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Distinct functional zones, sorted.
    pub func_zones: Vec<String>,
    /// Distinct problem types, sorted.
    pub problem_types: Vec<String>,
    /// The canonical rectification statuses, in progression order.
    pub rectify_statuses: Vec<String>,
    /// Active events, most recently issued first.
    pub events: Vec<EventOption>,
}

/// An event choice in the map filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOption {
    pub id: i64,
    pub event_name: String,
    pub issue_date: Option<NaiveDate>,
}
