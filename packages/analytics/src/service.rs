//! Cache-wrapped report access.
//!
//! [`ReportService`] derives a deterministic cache key per report and
//! filter combination, serves a cached payload while it is fresh, and
//! otherwise computes the report and stores it with the configured TTL.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use geopark_analytics_models::{
    FeatureCollection, FilterOptions, GroupCount, MapQueryParams, MapStats, MonthlyTrend,
    OverdueItem, OverviewStats, ParkRanking,
};
use geopark_cache::TtlCache;
use geopark_database::RecordStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{AnalyticsError, map, reports};

/// Default TTL for dashboard statistics, in seconds.
pub const DEFAULT_STATS_CACHE_TTL: u64 = 30;

/// Default TTL for map payloads, in seconds.
pub const DEFAULT_MAP_CACHE_TTL: u64 = 15;

/// Cache lifetimes for report payloads. A TTL of zero caches forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    /// TTL for `stats:*` keys.
    pub stats_cache_ttl: u64,
    /// TTL for `map:*` keys.
    pub map_cache_ttl: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            stats_cache_ttl: DEFAULT_STATS_CACHE_TTL,
            map_cache_ttl: DEFAULT_MAP_CACHE_TTL,
        }
    }
}

impl ReportConfig {
    /// Reads `STATS_CACHE_TTL` and `MAP_CACHE_TTL`, falling back to the
    /// defaults for missing or malformed values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            stats_cache_ttl: std::env::var("STATS_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_STATS_CACHE_TTL),
            map_cache_ttl: std::env::var("MAP_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAP_CACHE_TTL),
        }
    }
}

/// Reports served through a shared [`TtlCache`].
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn RecordStore>,
    cache: Arc<TtlCache>,
    config: ReportConfig,
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService")
            .field("cache_entries", &self.cache.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReportService {
    /// Creates a service over `store`, memoizing into `cache`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<TtlCache>, config: ReportConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// The underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    /// The active TTL configuration.
    #[must_use]
    pub const fn config(&self) -> ReportConfig {
        self.config
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    async fn cached<T, F, Fut>(&self, key: &str, ttl: u64, compute: F) -> Result<T, AnalyticsError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AnalyticsError>>,
    {
        if let Some(value) = self.cache.get(key) {
            match serde_json::from_value(value) {
                Ok(payload) => {
                    log::debug!("Cache hit for {key}");
                    return Ok(payload);
                }
                Err(e) => log::warn!("Discarding unreadable cache entry {key}: {e}"),
            }
        } else {
            log::debug!("Cache miss for {key}");
        }

        let payload = compute().await?;

        match serde_json::to_value(&payload) {
            Ok(value) => self.cache.set(key, value, ttl),
            Err(e) => log::warn!("Failed to serialize payload for {key}: {e}"),
        }

        Ok(payload)
    }

    /// Headline counts, cached under `stats:overview`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn overview(&self) -> Result<OverviewStats, AnalyticsError> {
        self.cached("stats:overview", self.config.stats_cache_ttl, || {
            reports::overview(self.store.as_ref(), Self::today())
        })
        .await
    }

    /// Problem type breakdown, cached under `stats:problem_types`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn problem_types(&self) -> Result<Vec<GroupCount>, AnalyticsError> {
        self.cached("stats:problem_types", self.config.stats_cache_ttl, || {
            reports::problem_types(self.store.as_ref())
        })
        .await
    }

    /// Functional zone breakdown, cached under `stats:func_zones`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn func_zones(&self) -> Result<Vec<GroupCount>, AnalyticsError> {
        self.cached("stats:func_zones", self.config.stats_cache_ttl, || {
            reports::func_zones(self.store.as_ref())
        })
        .await
    }

    /// Rectification status breakdown, cached under
    /// `stats:rectify_progress`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn rectify_progress(&self) -> Result<Vec<GroupCount>, AnalyticsError> {
        self.cached("stats:rectify_progress", self.config.stats_cache_ttl, || {
            reports::rectify_progress(self.store.as_ref())
        })
        .await
    }

    /// Impact level breakdown, cached under `stats:impact_analysis`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn impact_analysis(&self) -> Result<Vec<GroupCount>, AnalyticsError> {
        self.cached("stats:impact_analysis", self.config.stats_cache_ttl, || {
            reports::impact_analysis(self.store.as_ref())
        })
        .await
    }

    /// Trailing twelve-month trend, cached under `stats:monthly_trend`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn monthly_trend(&self) -> Result<MonthlyTrend, AnalyticsError> {
        self.cached("stats:monthly_trend", self.config.stats_cache_ttl, || {
            reports::monthly_trend(self.store.as_ref(), Self::today())
        })
        .await
    }

    /// Per-park counts, cached under `stats:park_ranking`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn park_ranking(&self) -> Result<Vec<ParkRanking>, AnalyticsError> {
        self.cached("stats:park_ranking", self.config.stats_cache_ttl, || {
            reports::park_ranking(self.store.as_ref())
        })
        .await
    }

    /// Overdue records, cached under `stats:overdue_list`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn overdue_list(&self) -> Result<Vec<OverdueItem>, AnalyticsError> {
        self.cached("stats:overdue_list", self.config.stats_cache_ttl, || {
            reports::overdue_list(self.store.as_ref(), Self::today())
        })
        .await
    }

    /// Map features for `params`, cached per filter combination.
    ///
    /// Parameters are validated first; an invalid request touches neither
    /// the cache nor the store.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidParameter`] for malformed filters,
    /// or [`AnalyticsError::Store`] if the query fails.
    pub async fn map_features(
        &self,
        params: &MapQueryParams,
    ) -> Result<FeatureCollection, AnalyticsError> {
        let filter = map::parse_filter(params)?;
        let key = map::features_cache_key(params);

        self.cached(&key, self.config.map_cache_ttl, || {
            map::features_for(self.store.as_ref(), &filter)
        })
        .await
    }

    /// Map status counts, cached under `map:stats`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be computed.
    pub async fn map_stats(&self) -> Result<MapStats, AnalyticsError> {
        self.cached("map:stats", self.config.map_cache_ttl, || {
            map::stats(self.store.as_ref())
        })
        .await
    }

    /// Filter dropdown values. Not cached.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if a store query fails.
    pub async fn filter_options(&self) -> Result<FilterOptions, AnalyticsError> {
        map::filter_options(self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use geopark_database::{MemoryStore, StoreError};
    use geopark_database_models::{GroupField, GroupRow, RecordFilter, RecordOrder};
    use geopark_tuban_models::{Event, RectifyStatus, ViolationRecord};
    use serde_json::json;

    use super::*;

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn count(&self, _filter: &RecordFilter) -> Result<u64, StoreError> {
            Err(StoreError::Connection("store offline".to_string()))
        }

        async fn group_count(
            &self,
            _field: GroupField,
            _filter: &RecordFilter,
        ) -> Result<Vec<GroupRow>, StoreError> {
            Err(StoreError::Connection("store offline".to_string()))
        }

        async fn fetch(
            &self,
            _filter: &RecordFilter,
            _order: RecordOrder,
        ) -> Result<Vec<ViolationRecord>, StoreError> {
            Err(StoreError::Connection("store offline".to_string()))
        }

        async fn active_events(&self) -> Result<Vec<Event>, StoreError> {
            Err(StoreError::Connection("store offline".to_string()))
        }
    }

    fn record(id: i64) -> ViolationRecord {
        let mut record = ViolationRecord::new(id, format!("TB{id:03}"), "Songshan");
        record.rectify_status = Some(RectifyStatus::NotStarted);
        record.longitude = Some(113.0);
        record.latitude = Some(34.5);
        record
    }

    fn service(store: Arc<MemoryStore>) -> ReportService {
        ReportService::new(store, Arc::new(TtlCache::new()), ReportConfig::default())
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let store = Arc::new(MemoryStore::with_records(vec![record(1)]));
        let service = service(Arc::clone(&store));

        assert_eq!(service.overview().await.unwrap().total_count, 1);
        assert!(service.cache().get("stats:overview").is_some());

        store.push(record(2));
        assert_eq!(service.overview().await.unwrap().total_count, 1);

        service.cache().clear();
        assert_eq!(service.overview().await.unwrap().total_count, 2);
    }

    #[tokio::test]
    async fn reports_use_their_own_keys() {
        let store = Arc::new(MemoryStore::with_records(vec![record(1)]));
        let service = service(store);

        service.problem_types().await.unwrap();
        service.func_zones().await.unwrap();
        service.rectify_progress().await.unwrap();
        service.impact_analysis().await.unwrap();
        service.monthly_trend().await.unwrap();
        service.park_ranking().await.unwrap();
        service.overdue_list().await.unwrap();
        service.map_stats().await.unwrap();
        service
            .map_features(&MapQueryParams {
                func_zone: Some("核心区".to_string()),
                ..MapQueryParams::default()
            })
            .await
            .unwrap();

        for key in [
            "stats:problem_types",
            "stats:func_zones",
            "stats:rectify_progress",
            "stats:impact_analysis",
            "stats:monthly_trend",
            "stats:park_ranking",
            "stats:overdue_list",
            "map:stats",
            "map:tubans:核心区:::",
        ] {
            assert!(service.cache().get(key).is_some(), "missing {key}");
        }
        assert_eq!(service.cache().len(), 9);
    }

    #[tokio::test]
    async fn unreadable_cache_entry_is_recomputed() {
        let store = Arc::new(MemoryStore::with_records(vec![record(1)]));
        let service = service(store);
        service
            .cache()
            .set("stats:overview", json!("not an overview"), 0);

        let stats = service.overview().await.unwrap();
        assert_eq!(stats.total_count, 1);
        assert_eq!(
            service.cache().get("stats:overview").unwrap()["total_count"],
            1
        );
    }

    #[tokio::test]
    async fn invalid_event_id_writes_nothing() {
        let store = Arc::new(MemoryStore::with_records(vec![record(1)]));
        let service = service(store);

        let result = service
            .map_features(&MapQueryParams {
                event_id: Some("x1".to_string()),
                ..MapQueryParams::default()
            })
            .await;

        assert!(matches!(
            result,
            Err(AnalyticsError::InvalidParameter { .. })
        ));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn store_errors_propagate_and_are_not_cached() {
        let service = ReportService::new(
            Arc::new(FailingStore),
            Arc::new(TtlCache::new()),
            ReportConfig::default(),
        );

        assert!(matches!(
            service.overview().await,
            Err(AnalyticsError::Store(StoreError::Connection(_)))
        ));
        assert!(matches!(
            service.map_features(&MapQueryParams::default()).await,
            Err(AnalyticsError::Store(_))
        ));
        assert!(service.filter_options().await.is_err());
        assert!(service.cache().is_empty());
    }

    #[test]
    fn default_ttls() {
        let config = ReportConfig::default();
        assert_eq!(config.stats_cache_ttl, 30);
        assert_eq!(config.map_cache_ttl, 15);
    }
}
