#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-process TTL cache for precomputed report payloads.
//!
//! Report endpoints are read-heavy and tolerate a few seconds of staleness,
//! so their JSON payloads are memoized here under a string key with a
//! per-entry expiry. Expired entries are evicted lazily, by the read that
//! observes them and by every write; there is no background sweep.
//!
//! Every operation is total: a missing or expired key reads as `None`, and
//! a poisoned lock is recovered rather than reported.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;

/// A cached payload with an optional absolute expiry.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    /// `None` means the entry never expires.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-wide key/value store with per-entry expiry.
///
/// Shared between request handlers behind an `Arc`. A single mutex guards
/// the read, evict and write sequence so a lazy eviction can never race a
/// concurrent `set` on the same key.
#[derive(Debug, Default)]
pub struct TtlCache {
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

impl TtlCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value stored under `key` if it has not expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    /// Same as [`TtlCache::get`], evaluated at `now`.
    ///
    /// An entry whose expiry is at or before `now` is removed and reported
    /// as absent.
    #[must_use]
    pub fn get_at(&self, key: &str, now: Instant) -> Option<Value> {
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            entries.remove(key);
            log::trace!("Cache entry '{key}' expired");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key` for `ttl_seconds`, replacing any existing
    /// entry. A TTL of zero stores the entry without expiry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl_seconds: u64) {
        self.set_at(key, value, ttl_seconds, Instant::now());
    }

    /// Same as [`TtlCache::set`], with the expiry measured from `now`.
    ///
    /// Entries already expired at `now` are purged first, so keys that are
    /// written once and never read again cannot accumulate.
    pub fn set_at(&self, key: impl Into<String>, value: Value, ttl_seconds: u64, now: Instant) {
        let expires_at = if ttl_seconds == 0 {
            None
        } else {
            now.checked_add(Duration::from_secs(ttl_seconds))
        };

        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            log::trace!("Purged {purged} expired cache entries");
        }

        entries.insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Removes the entry under `key`, returning its value if it had not
    /// expired.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        self.lock()
            .remove(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
