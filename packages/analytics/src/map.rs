//! Map layer: GeoJSON features, map-side status counts and filter options.

use geopark_analytics_models::{
    EventOption, Feature, FeatureCollection, FeatureProperties, FilterOptions, MapQueryParams,
    MapStats,
};
use geopark_database::RecordStore;
use geopark_database_models::{GroupField, RecordFilter, RecordOrder};
use geopark_tuban_models::{RectifyStatus, ViolationRecord, YesNo};

use crate::AnalyticsError;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validates raw map query parameters and turns them into a store filter.
///
/// Blank values mean "no filter". The filter always requires coordinates.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if `event_id` is present but
/// not an integer.
pub fn parse_filter(params: &MapQueryParams) -> Result<RecordFilter, AnalyticsError> {
    let event_id = non_empty(params.event_id.as_deref())
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| AnalyticsError::InvalidParameter {
                    name: "event_id".to_string(),
                    value: raw.to_string(),
                })
        })
        .transpose()?;

    Ok(RecordFilter {
        func_zone: non_empty(params.func_zone.as_deref()).map(ToString::to_string),
        problem_type: non_empty(params.problem_type.as_deref()).map(ToString::to_string),
        rectify_status: non_empty(params.rectify_status.as_deref()).map(RectifyStatus::from_label),
        event_id,
        has_coordinates: true,
        ..RecordFilter::default()
    })
}

/// Percent-encodes the key separator so a `:` inside a value cannot shift
/// it into the next segment.
fn key_segment(value: Option<&str>) -> String {
    non_empty(value)
        .unwrap_or_default()
        .replace('%', "%25")
        .replace(':', "%3A")
}

/// Cache key for a map feature query, one per filter combination.
#[must_use]
pub fn features_cache_key(params: &MapQueryParams) -> String {
    format!(
        "map:tubans:{}:{}:{}:{}",
        key_segment(params.func_zone.as_deref()),
        key_segment(params.problem_type.as_deref()),
        key_segment(params.rectify_status.as_deref()),
        key_segment(params.event_id.as_deref()),
    )
}

fn to_feature(record: ViolationRecord) -> Option<Feature> {
    let (longitude, latitude) = record.coordinates()?;
    let status = record.display_status();

    Some(Feature::point(
        longitude,
        latitude,
        FeatureProperties {
            id: record.id,
            tuban_code: record.tuban_code,
            park_name: record.park_name,
            func_zone: record.func_zone.unwrap_or_default(),
            facility_name: record.facility_name.unwrap_or_default(),
            problem_type: record.problem_type.unwrap_or_default(),
            problem_desc: record.problem_desc.unwrap_or_default(),
            rectify_status: status.to_string(),
            is_closed: record.is_closed.to_string(),
            area: record.area,
            color: status.color().to_string(),
            rectify_deadline: record.rectify_deadline,
        },
    ))
}

/// One point feature per live, geolocated record matching `params`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] for a malformed filter
/// (before the store is queried), or [`AnalyticsError::Store`] if the query
/// fails.
pub async fn features(
    store: &dyn RecordStore,
    params: &MapQueryParams,
) -> Result<FeatureCollection, AnalyticsError> {
    let filter = parse_filter(params)?;
    features_for(store, &filter).await
}

/// Same as [`features`] with an already-validated filter.
///
/// # Errors
///
/// Returns [`AnalyticsError::Store`] if the query fails.
pub async fn features_for(
    store: &dyn RecordStore,
    filter: &RecordFilter,
) -> Result<FeatureCollection, AnalyticsError> {
    let records = store.fetch(filter, RecordOrder::Id).await?;
    Ok(FeatureCollection::new(
        records.into_iter().filter_map(to_feature).collect(),
    ))
}

/// Status counts over live, geolocated records.
///
/// # Errors
///
/// Returns [`AnalyticsError::Store`] if a query fails.
pub async fn stats(store: &dyn RecordStore) -> Result<MapStats, AnalyticsError> {
    let located = RecordFilter::all().geolocated();

    Ok(MapStats {
        total: store.count(&located).await?,
        pending: store
            .count(&located.clone().with_status(RectifyStatus::NotStarted))
            .await?,
        in_progress: store
            .count(&located.clone().with_status(RectifyStatus::InProgress))
            .await?,
        closed: store.count(&located.with_closed(YesNo::Yes)).await?,
    })
}

/// Dropdown values for map and list filters.
///
/// # Errors
///
/// Returns [`AnalyticsError::Store`] if a query fails.
pub async fn filter_options(store: &dyn RecordStore) -> Result<FilterOptions, AnalyticsError> {
    Ok(FilterOptions {
        func_zones: store.distinct_values(GroupField::FuncZone).await?,
        problem_types: store.distinct_values(GroupField::ProblemType).await?,
        rectify_statuses: RectifyStatus::canonical()
            .iter()
            .map(ToString::to_string)
            .collect(),
        events: store
            .active_events()
            .await?
            .into_iter()
            .map(|event| EventOption {
                id: event.id,
                event_name: event.event_name,
                issue_date: event.issue_date,
            })
            .collect(),
    })
}
