#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Violation record ("tuban") types and rectification status taxonomy.
//!
//! This crate defines the canonical shape of a suspected violation record
//! as read from the record store, along with the status vocabularies used
//! by the ledger. The ledger stores its statuses as Chinese labels, so each
//! enum serializes to and parses from those exact strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Label used for records whose grouping field is null or empty.
pub const UNCLASSIFIED: &str = "未分类";

/// Rectification progress of a violation record.
///
/// Values outside the three canonical stages are preserved verbatim in
/// [`RectifyStatus::Other`] so they still participate in totals and
/// group-by breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RectifyStatus {
    /// `未整改`: rectification has not started.
    NotStarted,
    /// `整改中`: rectification is under way.
    InProgress,
    /// `已整改`: rectification is done, pending verification or close-out.
    Completed,
    /// Any other label found in the ledger.
    Other(String),
}

impl RectifyStatus {
    /// Ledger label for [`Self::NotStarted`].
    pub const NOT_STARTED: &'static str = "未整改";
    /// Ledger label for [`Self::InProgress`].
    pub const IN_PROGRESS: &'static str = "整改中";
    /// Ledger label for [`Self::Completed`].
    pub const COMPLETED: &'static str = "已整改";

    /// Returns the ledger label for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => Self::NOT_STARTED,
            Self::InProgress => Self::IN_PROGRESS,
            Self::Completed => Self::COMPLETED,
            Self::Other(label) => label,
        }
    }

    /// Parses a ledger label. Never fails; unknown labels become
    /// [`Self::Other`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            Self::NOT_STARTED => Self::NotStarted,
            Self::IN_PROGRESS => Self::InProgress,
            Self::COMPLETED => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the record still counts toward overdue detection
    /// (not started or in progress).
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::NotStarted | Self::InProgress)
    }

    /// The fixed list of canonical stages, in progression order.
    #[must_use]
    pub const fn canonical() -> [Self; 3] {
        [Self::NotStarted, Self::InProgress, Self::Completed]
    }
}

impl std::fmt::Display for RectifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RectifyStatus {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<RectifyStatus> for String {
    fn from(value: RectifyStatus) -> Self {
        match value {
            RectifyStatus::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

/// A ledger yes/no flag (`是` / `否`).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum YesNo {
    /// `是`
    #[serde(rename = "是")]
    #[strum(serialize = "是")]
    Yes,
    /// `否`
    #[default]
    #[serde(rename = "否")]
    #[strum(serialize = "否")]
    No,
}

impl YesNo {
    /// Interprets a stored flag. Anything other than `是` reads as
    /// [`YesNo::No`].
    #[must_use]
    pub fn from_flag(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }

    /// Returns `true` for [`YesNo::Yes`].
    #[must_use]
    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// Status bucket a record is drawn under on the map.
///
/// A record can satisfy several conditions at once (for example closed
/// while its progress still reads "in progress"); it is always shown under
/// the highest-priority bucket, in the order the variants are declared.
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
pub enum DisplayStatus {
    /// `已销号`: closed out.
    #[serde(rename = "已销号")]
    #[strum(serialize = "已销号")]
    Closed,
    /// `整改中`
    #[serde(rename = "整改中")]
    #[strum(serialize = "整改中")]
    InProgress,
    /// `已整改`: completed, awaiting verification.
    #[serde(rename = "已整改")]
    #[strum(serialize = "已整改")]
    Completed,
    /// `未整改`: the fallback for everything else.
    #[serde(rename = "未整改")]
    #[strum(serialize = "未整改")]
    NotStarted,
}

impl DisplayStatus {
    /// Resolves the display bucket for a record's close-out flag and
    /// progress.
    #[must_use]
    pub const fn resolve(is_closed: YesNo, status: Option<&RectifyStatus>) -> Self {
        if is_closed.is_yes() {
            return Self::Closed;
        }
        match status {
            Some(RectifyStatus::InProgress) => Self::InProgress,
            Some(RectifyStatus::Completed) => Self::Completed,
            _ => Self::NotStarted,
        }
    }

    /// Hex color used to draw this bucket.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Closed => "#28a745",
            Self::InProgress => "#ffc107",
            Self::Completed => "#17a2b8",
            Self::NotStarted => "#dc3545",
        }
    }
}

/// A suspected violation record as read from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Database primary key.
    pub id: i64,
    /// Ledger code, unique per record.
    pub tuban_code: String,
    /// Name of the geopark the record belongs to.
    pub park_name: String,
    /// Functional zone (core, buffer, experimental, ...).
    pub func_zone: Option<String>,
    /// Activity or facility name.
    pub facility_name: Option<String>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Footprint area in square meters.
    pub area: Option<f64>,
    /// Problem classification.
    pub problem_type: Option<String>,
    /// Free-text problem description.
    pub problem_desc: Option<String>,
    /// Impact level (severe, moderate, minor).
    pub impact_level: Option<String>,
    /// Rectification progress.
    pub rectify_status: Option<RectifyStatus>,
    /// Whether the record has been closed out.
    pub is_closed: YesNo,
    /// Date the problem was discovered.
    pub discover_time: Option<NaiveDate>,
    /// Rectification deadline.
    pub rectify_deadline: Option<NaiveDate>,
    /// Date the rectification was verified.
    pub rectify_verify_time: Option<NaiveDate>,
    /// Soft-delete flag.
    pub is_deleted: bool,
}

impl ViolationRecord {
    /// Creates a live, open record with only the required fields set.
    #[must_use]
    pub fn new(id: i64, tuban_code: impl Into<String>, park_name: impl Into<String>) -> Self {
        Self {
            id,
            tuban_code: tuban_code.into(),
            park_name: park_name.into(),
            func_zone: None,
            facility_name: None,
            longitude: None,
            latitude: None,
            area: None,
            problem_type: None,
            problem_desc: None,
            impact_level: None,
            rectify_status: None,
            is_closed: YesNo::No,
            discover_time: None,
            rectify_deadline: None,
            rectify_verify_time: None,
            is_deleted: false,
        }
    }

    /// Returns the coordinates as `(longitude, latitude)` when both are
    /// present.
    #[must_use]
    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        }
    }

    /// Whether the deadline has passed while rectification is still open.
    ///
    /// Compared at day granularity: a deadline of today is not overdue.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.rectify_deadline, self.rectify_status.as_ref(), today)
    }

    /// The map display bucket for this record.
    #[must_use]
    pub const fn display_status(&self) -> DisplayStatus {
        DisplayStatus::resolve(self.is_closed, self.rectify_status.as_ref())
    }
}

/// A record about to be written to the store, as produced by ledger import.
///
/// Carries the full set of persisted ledger columns, a superset of what
/// [`ViolationRecord`] exposes to reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewViolationRecord {
    /// Ledger code, unique per record.
    pub tuban_code: String,
    /// Name of the geopark the record belongs to.
    pub park_name: String,
    /// Functional zone.
    pub func_zone: Option<String>,
    /// Activity or facility name.
    pub facility_name: Option<String>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Footprint area in square meters.
    pub area: Option<f64>,
    /// Acquisition date of the imagery the record was found on.
    pub image_date: Option<NaiveDate>,
    /// Organization that built the facility.
    pub build_unit: Option<String>,
    /// Construction date.
    pub build_time: Option<NaiveDate>,
    /// Whether the construction had approval.
    pub has_approval: Option<String>,
    /// Approval document number.
    pub approval_no: Option<String>,
    /// Date the problem was discovered.
    pub discover_time: Option<NaiveDate>,
    /// How the problem was discovered.
    pub discover_method: Option<String>,
    /// Date of the on-site check.
    pub check_time: Option<NaiveDate>,
    /// Who carried out the on-site check.
    pub check_person: Option<String>,
    /// Conclusion of the on-site check.
    pub check_result: Option<String>,
    /// Problem classification.
    pub problem_type: Option<String>,
    /// Free-text problem description.
    pub problem_desc: Option<String>,
    /// Geological heritage types affected.
    pub geo_heritage_type: Option<String>,
    /// Impact level.
    pub impact_level: Option<String>,
    /// Whether the activity is illegal (`是` / `否` / `待定`).
    pub is_illegal: Option<String>,
    /// Regulation clauses violated.
    pub violated_law: Option<String>,
    /// Rectification measures ordered.
    pub rectify_measure: Option<String>,
    /// Rectification deadline.
    pub rectify_deadline: Option<NaiveDate>,
    /// Rectification progress.
    pub rectify_status: Option<RectifyStatus>,
    /// Date the rectification was verified.
    pub rectify_verify_time: Option<NaiveDate>,
    /// Who verified the rectification.
    pub verify_person: Option<String>,
    /// Close-out flag.
    pub is_closed: Option<YesNo>,
    /// Whether a penalty was issued.
    pub is_punished: Option<String>,
    /// Form of the penalty.
    pub punish_type: Option<String>,
    /// Fine amount.
    pub fine_amount: Option<f64>,
    /// Penalty document number.
    pub punish_doc_no: Option<String>,
    /// Where the ledger entry came from.
    pub data_source: Option<String>,
    /// Whether the site is a patrol point.
    pub is_patrol_point: Option<String>,
    /// Responsible department or person.
    pub responsible_dept: Option<String>,
    /// Attachment file references.
    pub attachments: Option<String>,
    /// Free-text remark.
    pub remark: Option<String>,
}

/// An inspection event (satellite batch, special audit, patrol, public
/// report) that records can be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Database primary key.
    pub id: i64,
    /// Display name.
    pub event_name: String,
    /// Event kind.
    pub event_type: Option<String>,
    /// Date the event was issued or discovered.
    pub issue_date: Option<NaiveDate>,
    /// Free-text description.
    pub description: Option<String>,
    /// Inactive events are hidden from filter choices.
    pub is_active: bool,
}

/// An event about to be written to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display name.
    pub event_name: String,
    /// Event kind.
    pub event_type: Option<String>,
    /// Date the event was issued or discovered.
    pub issue_date: Option<NaiveDate>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Whether a deadline has passed while `status` is still open.
///
/// Records without a deadline are never overdue.
#[must_use]
pub fn is_overdue(
    deadline: Option<NaiveDate>,
    status: Option<&RectifyStatus>,
    today: NaiveDate,
) -> bool {
    match (deadline, status) {
        (Some(deadline), Some(status)) => status.is_open() && deadline < today,
        _ => false,
    }
}

/// Whole days elapsed since `deadline`, floored at zero.
#[must_use]
pub fn overdue_days(deadline: Option<NaiveDate>, today: NaiveDate) -> i64 {
    deadline.map_or(0, |deadline| (today - deadline).num_days().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rectify_status_label_roundtrip() {
        for status in RectifyStatus::canonical() {
            assert_eq!(RectifyStatus::from_label(status.as_str()), status);
        }
        assert_eq!(
            RectifyStatus::from_label("暂缓"),
            RectifyStatus::Other("暂缓".to_string())
        );
    }

    #[test]
    fn rectify_status_serializes_as_label() {
        let json = serde_json::to_string(&RectifyStatus::InProgress).unwrap();
        assert_eq!(json, "\"整改中\"");
        let parsed: RectifyStatus = serde_json::from_str("\"已整改\"").unwrap();
        assert_eq!(parsed, RectifyStatus::Completed);
    }

    #[test]
    fn yes_no_flag_defaults_to_no() {
        assert_eq!(YesNo::from_flag("是"), YesNo::Yes);
        assert_eq!(YesNo::from_flag(" 是 "), YesNo::Yes);
        assert_eq!(YesNo::from_flag("否"), YesNo::No);
        assert_eq!(YesNo::from_flag(""), YesNo::No);
        assert_eq!(YesNo::Yes.to_string(), "是");
    }

    #[test]
    fn display_status_priority() {
        let closed_in_progress =
            DisplayStatus::resolve(YesNo::Yes, Some(&RectifyStatus::InProgress));
        assert_eq!(closed_in_progress, DisplayStatus::Closed);

        assert_eq!(
            DisplayStatus::resolve(YesNo::No, Some(&RectifyStatus::InProgress)),
            DisplayStatus::InProgress
        );
        assert_eq!(
            DisplayStatus::resolve(YesNo::No, Some(&RectifyStatus::Completed)),
            DisplayStatus::Completed
        );
        assert_eq!(
            DisplayStatus::resolve(YesNo::No, Some(&RectifyStatus::NotStarted)),
            DisplayStatus::NotStarted
        );
        assert_eq!(
            DisplayStatus::resolve(YesNo::No, None),
            DisplayStatus::NotStarted
        );
        assert_eq!(
            DisplayStatus::resolve(YesNo::No, Some(&RectifyStatus::Other("x".into()))),
            DisplayStatus::NotStarted
        );
        assert_eq!(DisplayStatus::Closed.to_string(), "已销号");
        assert_eq!(DisplayStatus::NotStarted.color(), "#dc3545");
    }

    #[test]
    fn overdue_is_day_granular() {
        let today = date(2025, 3, 10);
        let open = RectifyStatus::InProgress;

        assert!(is_overdue(Some(date(2025, 3, 9)), Some(&open), today));
        assert!(!is_overdue(Some(today), Some(&open), today));
        assert!(!is_overdue(None, Some(&open), today));
        assert!(!is_overdue(
            Some(date(2025, 1, 1)),
            Some(&RectifyStatus::Completed),
            today
        ));
    }

    #[test]
    fn overdue_days_floor_at_zero() {
        let today = date(2025, 3, 10);
        assert_eq!(overdue_days(Some(date(2025, 3, 1)), today), 9);
        assert_eq!(overdue_days(Some(date(2025, 3, 20)), today), 0);
        assert_eq!(overdue_days(None, today), 0);
    }
}
