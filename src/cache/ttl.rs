//! TTL response cache
//!
//! Bounded-lifetime key/value store used to avoid repeat gateway calls for
//! identical reads. Entries are immutable once stored; writes to the
//! underlying data invalidate related keys instead of patching entries, so
//! the cache can serve stale data but never half-applied data.
//!
//! All operations are O(1) on DashMap except `invalidate`, which scans keys
//! for a substring match (coarse invalidation, correctness over precision).

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default staleness window: 5 minutes
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Number of keys included in the diagnostic sample
const STATS_KEY_SAMPLE: usize = 10;

struct CacheEntry {
    value: serde_json::Value,
    cached_at: Instant,
}

/// Snapshot of cache state for diagnostics only, never for correctness
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsReport {
    /// Number of live entries (may include not-yet-swept expired ones)
    pub entries: usize,
    /// At most the first 10 keys, for eyeballing what is cached
    pub sample_keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub invalidations: u64,
}

/// TTL cache for gateway responses
pub struct QueryCache {
    entries: DashMap<String, CacheEntry>,
    /// Staleness window in milliseconds; atomic so `updateConfig` can
    /// retune it without pausing readers
    ttl_ms: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    invalidations: AtomicU64,
}

impl QueryCache {
    /// Create a cache with the given staleness window
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms: AtomicU64::new(ttl.as_millis() as u64),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Create with the default 5-minute window
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TTL)
    }

    /// Current staleness window
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    /// Retune the staleness window; applies to existing entries too
    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_ms.store(ttl.as_millis() as u64, Ordering::Relaxed);
        debug!(ttl_ms = ttl.as_millis() as u64, "Cache TTL updated");
    }

    /// Store a value, overwriting any existing entry for the key
    pub fn set(&self, key: &str, value: serde_json::Value) {
        debug!(key = key, "Cache set");
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                cached_at: Instant::now(),
            },
        );
    }

    /// Fetch a value if still within the staleness window
    ///
    /// Expired entries are evicted on the spot and reported as a miss;
    /// a miss is an absence, never an error.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.cached_at.elapsed() <= self.ttl() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, "Cache hit");
                return Some(entry.value.clone());
            }
            drop(entry);
            self.entries.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = key, "Cache miss");
        None
    }

    /// Remove every key containing the given substring, returning the count
    pub fn invalidate(&self, pattern: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().contains(pattern))
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for key in &keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }

        self.invalidations.fetch_add(removed as u64, Ordering::Relaxed);
        debug!(pattern = pattern, removed = removed, "Cache invalidated");
        removed
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.clear();
        info!("Cache cleared");
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostic snapshot with a bounded key sample
    pub fn stats(&self) -> CacheStatsReport {
        let sample_keys = self
            .entries
            .iter()
            .take(STATS_KEY_SAMPLE)
            .map(|e| e.key().clone())
            .collect();

        CacheStatsReport {
            entries: self.entries.len(),
            sample_keys,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Sweep entries past the staleness window, returning the count removed
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.ttl();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.cached_at.elapsed() > ttl)
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for key in &expired {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed = removed, "Cleaned up expired cache entries");
        }
        removed
    }
}

/// Spawn a background task to periodically sweep expired entries
pub fn spawn_cleanup_task(cache: Arc<QueryCache>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = cache.cleanup_expired();
            debug!(
                removed = removed,
                entries = cache.len(),
                "Cache cleanup completed"
            );
        }
    });

    info!(
        interval_secs = interval.as_secs(),
        "Cache cleanup task started"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get() {
        let cache = QueryCache::with_defaults();
        cache.set("org-1:txn:abc", json!({"id": "abc"}));
        assert_eq!(cache.get("org-1:txn:abc"), Some(json!({"id": "abc"})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn miss_is_none() {
        let cache = QueryCache::with_defaults();
        assert!(cache.get("nothing").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn overwrite_replaces_value() {
        let cache = QueryCache::with_defaults();
        cache.set("k", json!(1));
        cache.set("k", json!(2));
        assert_eq!(cache.get("k"), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expires_after_ttl() {
        let cache = QueryCache::new(Duration::from_millis(5));
        cache.set("k", json!("v"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("k").is_none());
        // Expired entry was evicted on read
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn retuned_ttl_applies_to_existing_entries() {
        let cache = QueryCache::new(Duration::from_secs(300));
        cache.set("k", json!("v"));
        cache.set_ttl(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn invalidate_matches_substring() {
        let cache = QueryCache::with_defaults();
        cache.set("org-1:query:aaaa", json!([]));
        cache.set("org-1:txn:abc", json!({}));
        cache.set("org-2:query:bbbb", json!([]));

        let removed = cache.invalidate("org-1");
        assert_eq!(removed, 2);
        assert!(cache.get("org-1:query:aaaa").is_none());
        assert!(cache.get("org-2:query:bbbb").is_some());
    }

    #[test]
    fn invalidate_query_pattern_spares_reads() {
        let cache = QueryCache::with_defaults();
        cache.set("org-1:query:aaaa", json!([]));
        cache.set("org-1:txn:abc", json!({}));

        cache.invalidate("org-1:query:");
        assert!(cache.get("org-1:query:aaaa").is_none());
        assert!(cache.get("org-1:txn:abc").is_some());
    }

    #[test]
    fn clear_removes_everything() {
        let cache = QueryCache::with_defaults();
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_sample_is_bounded() {
        let cache = QueryCache::with_defaults();
        for i in 0..25 {
            cache.set(&format!("key-{i}"), json!(i));
        }
        let stats = cache.stats();
        assert_eq!(stats.entries, 25);
        assert_eq!(stats.sample_keys.len(), 10);
    }

    #[test]
    fn cleanup_sweeps_only_expired() {
        let cache = QueryCache::new(Duration::from_millis(5));
        cache.set("old", json!(1));
        std::thread::sleep(Duration::from_millis(20));
        cache.set("fresh", json!(2));

        let removed = cache.cleanup_expired();
        assert_eq!(removed, 1);
        assert!(cache.get("fresh").is_some());
    }
}
