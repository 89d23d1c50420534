//! In-process record store.
//!
//! Holds a snapshot of violation records and record/event links in memory
//! and answers [`RecordStore`] queries by scanning it. Intended for fixtures,
//! tests, and small read-only deployments.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use geopark_database_models::{GroupField, GroupRow, RecordFilter, RecordOrder};
use geopark_tuban_models::{Event, NewViolationRecord, ViolationRecord, YesNo};

use crate::{RecordStore, RecordWriter, StoreError};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<ViolationRecord>,
    /// record ID -> linked event IDs
    events: BTreeMap<i64, BTreeSet<i64>>,
    catalog: Vec<Event>,
}

/// A [`RecordStore`] backed by a `Vec` of records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: Vec<ViolationRecord>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                records,
                ..Inner::default()
            }),
        }
    }

    /// Adds a record as-is, keeping its ID.
    pub fn push(&self, record: ViolationRecord) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .push(record);
    }

    /// Adds an event as-is, keeping its ID.
    pub fn push_event(&self, event: Event) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .catalog
            .push(event);
    }

    /// Links a record to an event.
    pub fn link_event(&self, record_id: i64, event_id: i64) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .entry(record_id)
            .or_default()
            .insert(event_id);
    }

    fn with_matching<T>(
        &self,
        filter: &RecordFilter,
        f: impl FnOnce(Vec<&ViolationRecord>) -> T,
    ) -> T {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let matching = inner
            .records
            .iter()
            .filter(|record| matches(filter, record, &inner.events))
            .collect();
        f(matching)
    }
}

fn matches(
    filter: &RecordFilter,
    record: &ViolationRecord,
    events: &BTreeMap<i64, BTreeSet<i64>>,
) -> bool {
    if record.is_deleted {
        return false;
    }

    if let Some(status) = &filter.rectify_status
        && record.rectify_status.as_ref() != Some(status)
    {
        return false;
    }

    if !filter.rectify_status_in.is_empty()
        && !record
            .rectify_status
            .as_ref()
            .is_some_and(|status| filter.rectify_status_in.contains(status))
    {
        return false;
    }

    if let Some(closed) = filter.is_closed
        && record.is_closed != closed
    {
        return false;
    }

    if let Some(before) = filter.deadline_before
        && !record.rectify_deadline.is_some_and(|deadline| deadline < before)
    {
        return false;
    }

    if let Some(zone) = &filter.func_zone
        && record.func_zone.as_deref() != Some(zone.as_str())
    {
        return false;
    }

    if let Some(problem_type) = &filter.problem_type
        && record.problem_type.as_deref() != Some(problem_type.as_str())
    {
        return false;
    }

    if let Some(event_id) = filter.event_id
        && !events
            .get(&record.id)
            .is_some_and(|linked| linked.contains(&event_id))
    {
        return false;
    }

    if filter.has_coordinates && record.coordinates().is_none() {
        return false;
    }

    if let Some(range) = &filter.discovered_between
        && !record.discover_time.is_some_and(|d| range.contains(d))
    {
        return false;
    }

    if let Some(range) = &filter.verified_between
        && !record.rectify_verify_time.is_some_and(|d| range.contains(d))
    {
        return false;
    }

    true
}

fn group_key(field: GroupField, record: &ViolationRecord) -> Option<String> {
    match field {
        GroupField::ProblemType => record.problem_type.clone(),
        GroupField::FuncZone => record.func_zone.clone(),
        GroupField::ImpactLevel => record.impact_level.clone(),
        GroupField::RectifyStatus => record.rectify_status.as_ref().map(ToString::to_string),
        GroupField::ParkName => Some(record.park_name.clone()),
        GroupField::DiscoverMonth => record
            .discover_time
            .map(|date| date.format("%Y-%m").to_string()),
        GroupField::VerifyMonth => record
            .rectify_verify_time
            .map(|date| date.format("%Y-%m").to_string()),
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        Ok(self.with_matching(filter, |records| records.len() as u64))
    }

    async fn group_count(
        &self,
        field: GroupField,
        filter: &RecordFilter,
    ) -> Result<Vec<GroupRow>, StoreError> {
        Ok(self.with_matching(filter, |records| {
            let mut buckets: BTreeMap<Option<String>, u64> = BTreeMap::new();
            for record in records {
                *buckets.entry(group_key(field, record)).or_insert(0) += 1;
            }
            buckets
                .into_iter()
                .map(|(key, count)| GroupRow { key, count })
                .collect()
        }))
    }

    async fn fetch(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
    ) -> Result<Vec<ViolationRecord>, StoreError> {
        let mut rows: Vec<ViolationRecord> =
            self.with_matching(filter, |records| records.into_iter().cloned().collect());

        match order {
            RecordOrder::Id => rows.sort_by_key(|record| record.id),
            RecordOrder::DeadlineAsc => rows.sort_by_key(|record| {
                (
                    record.rectify_deadline.is_none(),
                    record.rectify_deadline,
                    record.id,
                )
            }),
        }

        Ok(rows)
    }

    async fn active_events(&self) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut events: Vec<Event> = inner
            .catalog
            .iter()
            .filter(|event| event.is_active)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            a.issue_date
                .is_none()
                .cmp(&b.issue_date.is_none())
                .then_with(|| b.issue_date.cmp(&a.issue_date))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(events)
    }
}

#[async_trait]
impl RecordWriter for MemoryStore {
    async fn code_exists(&self, tuban_code: &str) -> Result<bool, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .records
            .iter()
            .any(|record| record.tuban_code == tuban_code))
    }

    async fn insert(&self, record: &NewViolationRecord) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner
            .records
            .iter()
            .any(|existing| existing.tuban_code == record.tuban_code)
        {
            return Err(StoreError::DuplicateCode(record.tuban_code.clone()));
        }

        let id = inner.records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        inner.records.push(ViolationRecord {
            id,
            tuban_code: record.tuban_code.clone(),
            park_name: record.park_name.clone(),
            func_zone: record.func_zone.clone(),
            facility_name: record.facility_name.clone(),
            longitude: record.longitude,
            latitude: record.latitude,
            area: record.area,
            problem_type: record.problem_type.clone(),
            problem_desc: record.problem_desc.clone(),
            impact_level: record.impact_level.clone(),
            rectify_status: record.rectify_status.clone(),
            is_closed: record.is_closed.unwrap_or(YesNo::No),
            discover_time: record.discover_time,
            rectify_deadline: record.rectify_deadline,
            rectify_verify_time: record.rectify_verify_time,
            is_deleted: false,
        });

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use geopark_database_models::DateRange;
    use geopark_tuban_models::RectifyStatus;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> MemoryStore {
        let mut a = ViolationRecord::new(1, "TB001", "Zhangjiajie");
        a.func_zone = Some("核心区".to_string());
        a.rectify_status = Some(RectifyStatus::NotStarted);
        a.rectify_deadline = Some(date(2025, 3, 1));
        a.discover_time = Some(date(2025, 1, 15));
        a.longitude = Some(110.48);
        a.latitude = Some(29.31);

        let mut b = ViolationRecord::new(2, "TB002", "Songshan");
        b.func_zone = Some("缓冲区".to_string());
        b.rectify_status = Some(RectifyStatus::InProgress);
        b.rectify_deadline = Some(date(2025, 2, 1));
        b.longitude = Some(112.95);

        let mut deleted = ViolationRecord::new(3, "TB003", "Songshan");
        deleted.rectify_status = Some(RectifyStatus::NotStarted);
        deleted.is_deleted = true;

        let c = ViolationRecord::new(4, "TB004", "Zhangjiajie");

        MemoryStore::with_records(vec![a, b, deleted, c])
    }

    #[tokio::test]
    async fn count_excludes_deleted() {
        let store = fixture();
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 3);
        assert_eq!(
            store
                .count(&RecordFilter::all().with_status(RectifyStatus::NotStarted))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn coordinates_require_both_axes() {
        let store = fixture();
        let rows = store
            .fetch(&RecordFilter::all().geolocated(), RecordOrder::Id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tuban_code, "TB001");
    }

    #[tokio::test]
    async fn group_count_keeps_null_bucket() {
        let store = fixture();
        let rows = store
            .group_count(GroupField::FuncZone, &RecordFilter::all())
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![
                GroupRow {
                    key: None,
                    count: 1
                },
                GroupRow {
                    key: Some("核心区".to_string()),
                    count: 1
                },
                GroupRow {
                    key: Some("缓冲区".to_string()),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn deadline_order_and_overdue_filter() {
        let store = fixture();
        let rows = store
            .fetch(
                &RecordFilter::overdue(date(2025, 6, 1)),
                RecordOrder::DeadlineAsc,
            )
            .await
            .unwrap();
        let codes: Vec<&str> = rows.iter().map(|r| r.tuban_code.as_str()).collect();
        assert_eq!(codes, vec!["TB002", "TB001"]);
    }

    #[tokio::test]
    async fn overdue_filter_agrees_with_record_rule() {
        let store = fixture();
        let mut completed = ViolationRecord::new(5, "TB005", "Songshan");
        completed.rectify_status = Some(RectifyStatus::Completed);
        completed.rectify_deadline = Some(date(2025, 1, 1));
        store.push(completed);
        let mut other = ViolationRecord::new(6, "TB006", "Songshan");
        other.rectify_status = Some(RectifyStatus::from("暂缓".to_string()));
        other.rectify_deadline = Some(date(2025, 1, 1));
        store.push(other);
        let mut due_today = ViolationRecord::new(7, "TB007", "Songshan");
        due_today.rectify_status = Some(RectifyStatus::InProgress);
        due_today.rectify_deadline = Some(date(2025, 2, 1));
        store.push(due_today);

        let all = store
            .fetch(&RecordFilter::all(), RecordOrder::Id)
            .await
            .unwrap();
        for today in [date(2025, 1, 1), date(2025, 2, 1), date(2025, 2, 2), date(2025, 6, 1)] {
            let filtered: Vec<i64> = store
                .fetch(&RecordFilter::overdue(today), RecordOrder::Id)
                .await
                .unwrap()
                .iter()
                .map(|r| r.id)
                .collect();
            let expected: Vec<i64> = all
                .iter()
                .filter(|r| r.is_overdue(today))
                .map(|r| r.id)
                .collect();
            assert_eq!(filtered, expected, "overdue as of {today}");
        }
    }

    #[tokio::test]
    async fn active_events_newest_first() {
        let store = fixture();
        let event = |id: i64, issue_date: Option<NaiveDate>, is_active: bool| Event {
            id,
            event_name: format!("event {id}"),
            event_type: None,
            issue_date,
            description: None,
            is_active,
        };
        store.push_event(event(1, Some(date(2023, 11, 1)), true));
        store.push_event(event(2, None, true));
        store.push_event(event(3, Some(date(2024, 5, 1)), true));
        store.push_event(event(4, Some(date(2025, 1, 1)), false));

        let ids: Vec<i64> = store
            .active_events()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn event_and_month_filters() {
        let store = fixture();
        store.link_event(2, 7);

        let filter = RecordFilter {
            event_id: Some(7),
            ..RecordFilter::default()
        };
        let rows = store.fetch(&filter, RecordOrder::Id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 2);

        let months = store
            .group_count(
                GroupField::DiscoverMonth,
                &RecordFilter {
                    discovered_between: Some(DateRange::new(date(2025, 1, 1), date(2025, 1, 31))),
                    ..RecordFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            months,
            vec![GroupRow {
                key: Some("2025-01".to_string()),
                count: 1
            }]
        );
    }

    #[tokio::test]
    async fn distinct_values_skip_empty() {
        let store = fixture();
        let mut extra = ViolationRecord::new(5, "TB005", "Songshan");
        extra.func_zone = Some(String::new());
        store.push(extra);

        let zones = store.distinct_values(GroupField::FuncZone).await.unwrap();
        assert_eq!(zones, vec!["核心区".to_string(), "缓冲区".to_string()]);
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_rejects_duplicates() {
        let store = fixture();
        let record = NewViolationRecord {
            tuban_code: "TB010".to_string(),
            park_name: "Songshan".to_string(),
            ..NewViolationRecord::default()
        };

        let id = store.insert(&record).await.unwrap();
        assert_eq!(id, 5);
        assert!(store.code_exists("TB010").await.unwrap());
        assert!(store.code_exists("TB003").await.unwrap());
        assert!(matches!(
            store.insert(&record).await,
            Err(StoreError::DuplicateCode(code)) if code == "TB010"
        ));
    }
}
