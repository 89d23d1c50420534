//! Dashboard reports over the record store.
//!
//! Every function here is read-only and takes `today` explicitly so overdue
//! and trend results are reproducible.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use geopark_analytics_models::{GroupCount, MonthlyTrend, OverdueItem, OverviewStats, ParkRanking};
use geopark_database::RecordStore;
use geopark_database_models::{DateRange, GroupField, RecordFilter, RecordOrder};
use geopark_tuban_models::{RectifyStatus, UNCLASSIFIED, YesNo, overdue_days};

use crate::AnalyticsError;
use crate::months::{TREND_MONTHS, month_key, trailing_months};

/// Headline counts: total, pending, in progress, closed and overdue.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if a store query fails.
pub async fn overview(
    store: &dyn RecordStore,
    today: NaiveDate,
) -> Result<OverviewStats, AnalyticsError> {
    let total_count = store.count(&RecordFilter::all()).await?;
    let pending_count = store
        .count(&RecordFilter::all().with_status(RectifyStatus::NotStarted))
        .await?;
    let in_progress_count = store
        .count(&RecordFilter::all().with_status(RectifyStatus::InProgress))
        .await?;
    let closed_count = store
        .count(&RecordFilter::all().with_closed(YesNo::Yes))
        .await?;
    let overdue_count = store.count(&RecordFilter::overdue(today)).await?;

    Ok(OverviewStats {
        total_count,
        pending_count,
        in_progress_count,
        closed_count,
        overdue_count,
    })
}

/// Counts live records per distinct value of `field`.
///
/// Null and blank values are reported under [`UNCLASSIFIED`]; buckets that
/// end up with the same label are merged. Buckets are ordered by label.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn group_breakdown(
    store: &dyn RecordStore,
    field: GroupField,
) -> Result<Vec<GroupCount>, AnalyticsError> {
    let rows = store.group_count(field, &RecordFilter::all()).await?;

    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    for row in rows {
        let name = row
            .key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| UNCLASSIFIED.to_string());
        *buckets.entry(name).or_insert(0) += row.count;
    }

    Ok(buckets
        .into_iter()
        .map(|(name, value)| GroupCount { name, value })
        .collect())
}

/// Breakdown by problem type.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn problem_types(store: &dyn RecordStore) -> Result<Vec<GroupCount>, AnalyticsError> {
    group_breakdown(store, GroupField::ProblemType).await
}

/// Breakdown by functional zone.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn func_zones(store: &dyn RecordStore) -> Result<Vec<GroupCount>, AnalyticsError> {
    group_breakdown(store, GroupField::FuncZone).await
}

/// Breakdown by rectification status.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn rectify_progress(store: &dyn RecordStore) -> Result<Vec<GroupCount>, AnalyticsError> {
    group_breakdown(store, GroupField::RectifyStatus).await
}

/// Breakdown by impact level.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn impact_analysis(store: &dyn RecordStore) -> Result<Vec<GroupCount>, AnalyticsError> {
    group_breakdown(store, GroupField::ImpactLevel).await
}

/// Per-park totals, ordered by park name. Parks without live records do
/// not appear.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if a store query fails.
pub async fn park_ranking(store: &dyn RecordStore) -> Result<Vec<ParkRanking>, AnalyticsError> {
    let totals = store
        .group_count(GroupField::ParkName, &RecordFilter::all())
        .await?;
    let pending = store
        .group_count(
            GroupField::ParkName,
            &RecordFilter::all().with_status(RectifyStatus::NotStarted),
        )
        .await?;
    let in_progress = store
        .group_count(
            GroupField::ParkName,
            &RecordFilter::all().with_status(RectifyStatus::InProgress),
        )
        .await?;
    let closed = store
        .group_count(
            GroupField::ParkName,
            &RecordFilter::all().with_closed(YesNo::Yes),
        )
        .await?;

    let mut parks: BTreeMap<String, ParkRanking> = BTreeMap::new();

    for row in totals {
        let park_name = row.key.unwrap_or_default();
        let entry = parks
            .entry(park_name.clone())
            .or_insert_with(|| ParkRanking {
                park_name,
                ..ParkRanking::default()
            });
        entry.total_count += row.count;
    }

    // Subsets of the totals, so every key is already present.
    for row in pending {
        if let Some(entry) = parks.get_mut(&row.key.unwrap_or_default()) {
            entry.pending_count += row.count;
        }
    }
    for row in in_progress {
        if let Some(entry) = parks.get_mut(&row.key.unwrap_or_default()) {
            entry.in_progress_count += row.count;
        }
    }
    for row in closed {
        if let Some(entry) = parks.get_mut(&row.key.unwrap_or_default()) {
            entry.closed_count += row.count;
        }
    }

    Ok(parks
        .into_values()
        .filter(|park| park.total_count > 0)
        .collect())
}

/// Discovered and closed counts for the twelve months ending with the
/// month of `today`, zero-filled.
///
/// Only records dated within `[first day of the oldest month, today]` are
/// counted. A record counts as closed in the month of its verification date
/// when it is also closed out.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if a store query fails.
pub async fn monthly_trend(
    store: &dyn RecordStore,
    today: NaiveDate,
) -> Result<MonthlyTrend, AnalyticsError> {
    let months = trailing_months(today, TREND_MONTHS);
    let window = DateRange::new(months.first().copied().unwrap_or(today), today);

    let discovered_rows = store
        .group_count(
            GroupField::DiscoverMonth,
            &RecordFilter {
                discovered_between: Some(window),
                ..RecordFilter::default()
            },
        )
        .await?;
    let closed_rows = store
        .group_count(
            GroupField::VerifyMonth,
            &RecordFilter {
                verified_between: Some(window),
                is_closed: Some(YesNo::Yes),
                ..RecordFilter::default()
            },
        )
        .await?;

    let discovered_by_month: BTreeMap<String, u64> = discovered_rows
        .into_iter()
        .filter_map(|row| row.key.map(|key| (key, row.count)))
        .collect();
    let closed_by_month: BTreeMap<String, u64> = closed_rows
        .into_iter()
        .filter_map(|row| row.key.map(|key| (key, row.count)))
        .collect();

    let mut trend = MonthlyTrend::default();
    for month in months {
        let key = month_key(month);
        trend
            .discovered
            .push(discovered_by_month.get(&key).copied().unwrap_or(0));
        trend
            .closed
            .push(closed_by_month.get(&key).copied().unwrap_or(0));
        trend.months.push(key);
    }

    Ok(trend)
}

/// Open records past their deadline, soonest deadline first.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn overdue_list(
    store: &dyn RecordStore,
    today: NaiveDate,
) -> Result<Vec<OverdueItem>, AnalyticsError> {
    let records = store
        .fetch(&RecordFilter::overdue(today), RecordOrder::DeadlineAsc)
        .await?;

    Ok(records
        .into_iter()
        .map(|record| OverdueItem {
            id: record.id,
            overdue_days: overdue_days(record.rectify_deadline, today),
            tuban_code: record.tuban_code,
            park_name: record.park_name,
            facility_name: record.facility_name.unwrap_or_default(),
            problem_type: record.problem_type.unwrap_or_default(),
            rectify_deadline: record.rectify_deadline,
        })
        .collect())
}
