// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decision cache.
//!
//! A granted entitlement is memoised as `access:<pubkey> = <seconds>` with a
//! time-to-live of the same number of seconds, so repeated requests skip the
//! ledger until the paid time runs out.
//!
//! The key-value transport is abstracted by [`DecisionStore`]; the bundled
//! [`LruDecisionStore`] keeps records in a bounded in-process LRU.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use utoipa::ToSchema;

/// Prefix of every decision cache key.
pub const CACHE_KEY_PREFIX: &str = "access:";

/// Default number of identities kept by [`LruDecisionStore`].
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cached value for {key} is not an integer: {value:?}")]
    Corrupted { key: String, value: String },
}

/// Key-value transport used by the decision cache (`GET` / `SET .. EX` / `TTL`).
pub trait DecisionStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Remaining lifetime of a live record. Stores that cannot tell return
    /// `None` and the stored value is taken as is.
    fn ttl(&self, _key: &str) -> impl Future<Output = Result<Option<Duration>, CacheError>> + Send {
        async { Ok(None) }
    }

    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}

// =============================================================================
// In-process store
// =============================================================================

/// Store statistics for monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CacheStats {
    /// Lookups that found a live record.
    pub hits: u64,
    /// Lookups that found nothing or an expired record.
    pub misses: u64,
    /// Records written.
    pub additions: u64,
}

struct Record {
    value: String,
    expires_at: Instant,
}

struct Inner {
    records: LruCache<String, Record>,
    stats: CacheStats,
}

/// Bounded in-process key-value store with per-record expiry.
pub struct LruDecisionStore {
    inner: Mutex<Inner>,
}

impl LruDecisionStore {
    /// Create a store holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                records: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .lock()
            .map(|inner| inner.stats)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let now = Instant::now();
        let found = inner
            .records
            .get(key)
            .map(|record| (record.expires_at > now, record.value.clone()));
        let live = match found {
            Some((true, value)) => Some(value),
            Some((false, _)) => {
                inner.records.pop(key);
                None
            }
            None => None,
        };

        if live.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        Ok(live)
    }

    fn remaining(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let now = Instant::now();
        Ok(inner
            .records
            .peek(key)
            .and_then(|record| record.expires_at.checked_duration_since(now))
            .filter(|left| !left.is_zero()))
    }

    fn store(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Unavailable(format!("ttl {ttl:?} out of range")))?;
        inner
            .records
            .put(key.to_string(), Record { value, expires_at });
        inner.stats.additions += 1;
        Ok(())
    }
}

impl Default for LruDecisionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl DecisionStore for LruDecisionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.lookup(key)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.store(key, value, ttl)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.remaining(key)
    }
}

// =============================================================================
// Decision cache
// =============================================================================

/// Typed view over a [`DecisionStore`]: identity → seconds of access left.
pub struct DecisionCache<S> {
    store: S,
}

impl<S: DecisionStore> DecisionCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cache key of an identity. Hex credentials are case-insensitive.
    pub fn key(identity: &str) -> String {
        format!("{CACHE_KEY_PREFIX}{}", identity.trim().to_lowercase())
    }

    /// Seconds of access left for `identity`, if a live record exists.
    ///
    /// Absent, expired, and non-positive records are misses. A value that is
    /// not an integer is [`CacheError::Corrupted`]. The record's remaining
    /// lifetime is reported when the store knows it, rounded up to a second.
    pub async fn get(&self, identity: &str) -> Result<Option<u64>, CacheError> {
        let key = Self::key(identity);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let seconds: i64 = value
            .trim()
            .parse()
            .map_err(|_| CacheError::Corrupted { key: key.clone(), value: value.clone() })?;
        let Some(granted) = u64::try_from(seconds).ok().filter(|&s| s > 0) else {
            return Ok(None);
        };

        let left = match self.store.ttl(&key).await? {
            Some(left) => left.as_secs() + u64::from(left.subsec_nanos() > 0),
            None => granted,
        };
        Ok(Some(left.min(granted)).filter(|&s| s > 0))
    }

    /// Record `seconds` of access for `identity`, expiring after as many seconds.
    pub async fn put(&self, identity: &str, seconds: u64) -> Result<(), CacheError> {
        self.store
            .set(
                &Self::key(identity),
                seconds.to_string(),
                Duration::from_secs(seconds),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_put_and_get() {
        let store = LruDecisionStore::new(10);
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "42".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("42".to_string()));

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.additions, 1);
    }

    #[tokio::test]
    async fn store_expires_records() {
        let store = LruDecisionStore::new(10);
        store.set("k", "1".into(), Duration::from_millis(1)).await.unwrap();

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_evicts_least_recently_used() {
        let store = LruDecisionStore::new(2);
        for key in ["a", "b", "c"] {
            store.set(key, "1".into(), Duration::from_secs(60)).await.unwrap();
        }
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cache_round_trips_seconds_with_matching_ttl() {
        let cache = DecisionCache::new(LruDecisionStore::default());
        cache.put("ABCD", 259_200).await.unwrap();

        assert_eq!(cache.get("abcd").await.unwrap(), Some(259_200));
        assert_eq!(
            cache.store().get("access:abcd").await.unwrap(),
            Some("259200".to_string())
        );
    }

    #[tokio::test]
    async fn non_numeric_value_is_corrupted() {
        let cache = DecisionCache::new(LruDecisionStore::default());
        cache
            .store()
            .set("access:abcd", "tomorrow".into(), Duration::from_secs(60))
            .await
            .unwrap();

        let err = cache.get("abcd").await.unwrap_err();
        assert!(matches!(err, CacheError::Corrupted { ref value, .. } if value == "tomorrow"));
    }

    #[tokio::test]
    async fn non_positive_value_is_a_miss() {
        let cache = DecisionCache::new(LruDecisionStore::default());
        for value in ["0", "-5"] {
            cache
                .store()
                .set("access:abcd", value.into(), Duration::from_secs(60))
                .await
                .unwrap();
            assert_eq!(cache.get("abcd").await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn hit_reports_remaining_lifetime() {
        let cache = DecisionCache::new(LruDecisionStore::default());
        cache
            .store()
            .set("access:abcd", "259200".into(), Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(cache.get("abcd").await.unwrap(), Some(2));

        std::thread::sleep(Duration::from_millis(1_100));
        assert_eq!(cache.get("abcd").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn store_reports_ttl_of_live_records_only() {
        let store = LruDecisionStore::new(10);
        assert_eq!(store.ttl("k").await.unwrap(), None);

        store.set("k", "1".into(), Duration::from_secs(60)).await.unwrap();
        let left = store.ttl("k").await.unwrap().unwrap();
        assert!(left <= Duration::from_secs(60) && left > Duration::from_secs(59));
    }

    #[test]
    fn key_is_prefixed_and_case_folded() {
        assert_eq!(DecisionCache::<LruDecisionStore>::key(" AbC "), "access:abc");
    }
}
