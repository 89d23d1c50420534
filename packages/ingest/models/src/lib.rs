#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ledger import field, coercion and result types.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How a raw ledger cell is turned into a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Coercion {
    /// Trimmed text.
    Text,
    /// Decimal number.
    Decimal,
    /// Calendar date.
    Date,
}

/// An internal record field a ledger column maps onto.
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
pub enum LedgerField {
    TubanCode,
    ParkName,
    FuncZone,
    FacilityName,
    Longitude,
    Latitude,
    Area,
    ImageDate,
    BuildUnit,
    BuildTime,
    HasApproval,
    ApprovalNo,
    DiscoverTime,
    DiscoverMethod,
    CheckTime,
    CheckPerson,
    CheckResult,
    ProblemType,
    ProblemDesc,
    GeoHeritageType,
    ImpactLevel,
    IsIllegal,
    ViolatedLaw,
    RectifyMeasure,
    RectifyDeadline,
    RectifyStatus,
    RectifyVerifyTime,
    VerifyPerson,
    IsClosed,
    IsPunished,
    PunishType,
    FineAmount,
    PunishDocNo,
    DataSource,
    IsPatrolPoint,
    ResponsibleDept,
    Attachments,
    Remark,
}

impl LedgerField {
    /// The coercion applied to cells of this field.
    #[must_use]
    pub const fn coercion(self) -> Coercion {
        match self {
            Self::Longitude | Self::Latitude | Self::Area | Self::FineAmount => Coercion::Decimal,
            Self::ImageDate
            | Self::BuildTime
            | Self::DiscoverTime
            | Self::CheckTime
            | Self::RectifyDeadline
            | Self::RectifyVerifyTime => Coercion::Date,
            _ => Coercion::Text,
        }
    }
}

/// Outcome of a ledger import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows written to the store.
    pub inserted: u64,
    /// Rows whose ledger code already existed.
    pub skipped_existing: u64,
    /// Rows missing a required field.
    pub skipped_invalid: u64,
}

impl ImportSummary {
    /// Total rows seen.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.inserted + self.skipped_existing + self.skipped_invalid
    }
}
