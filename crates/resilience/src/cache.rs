use std::time::{Duration, Instant};

use dashmap::DashMap;

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, labels, resilience as resilience_metrics};

/// Entries kept before a `put` starts dropping stale, then oldest, keys.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Last successful response for a key.
#[derive(Debug, Clone)]
struct CacheEntry {
    response: CachedResponse,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) <= ttl
    }
}

/// A stored response, as put and as handed back on a fresh hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: String,
    pub content_type: Option<String>,
    /// Byte cap the body was cut at, if the download was truncated.
    pub truncated_at: Option<usize>,
}

impl CachedResponse {
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated_at.is_some()
    }
}

/// Key → last-good body store.
///
/// Freshness is decided by the caller's TTL at read time; reads never
/// delete. Once the map grows past its capacity, a `put` drops entries that
/// are stale under the TTL they were stored with, then the oldest ones.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResponseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &str, ttl: Duration) -> Option<CachedResponse> {
        self.get_at(key, ttl, Instant::now())
    }

    pub fn get_at(&self, key: &str, ttl: Duration, now: Instant) -> Option<CachedResponse> {
        let entry = self.entries.get(key)?;
        if !entry.is_fresh(ttl, now) {
            return None;
        }
        #[cfg(feature = "metrics")]
        counter!(resilience_metrics::CACHE_HITS_TOTAL, labels::ENDPOINT => key.to_string())
            .increment(1);
        Some(entry.response.clone())
    }

    /// Store `response` under `key`; `ttl` is only used to judge staleness
    /// when the cache is over capacity.
    pub fn put(&self, key: &str, response: CachedResponse, ttl: Duration) {
        self.put_at(key, response, ttl, Instant::now());
    }

    pub fn put_at(&self, key: &str, response: CachedResponse, ttl: Duration, now: Instant) {
        self.entries.insert(key.to_string(), CacheEntry {
            response,
            stored_at: now,
            ttl,
        });
        if self.entries.len() > self.capacity {
            self.shrink(now);
        }
    }

    fn shrink(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_fresh(entry.ttl, now));
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }
        let mut by_age: Vec<(Instant, String)> = self
            .entries
            .iter()
            .map(|e| (e.stored_at, e.key().clone()))
            .collect();
        by_age.sort_unstable();
        for (_, key) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn response(body: &str, content_type: Option<&str>) -> CachedResponse {
        CachedResponse {
            body: body.into(),
            content_type: content_type.map(Into::into),
            truncated_at: None,
        }
    }

    #[test]
    fn fresh_within_ttl_absent_after() {
        let cache = ResponseCache::new();
        let t0 = Instant::now();
        cache.put_at("wiki", response("body", Some("application/json")), MINUTE, t0);

        let hit = cache.get_at("wiki", MINUTE, t0 + MINUTE).unwrap();
        assert_eq!(hit.body, "body");
        assert_eq!(hit.content_type.as_deref(), Some("application/json"));
        assert!(!hit.is_truncated());

        assert!(cache.get_at("wiki", MINUTE, t0 + MINUTE + Duration::from_millis(1)).is_none());
    }

    #[test]
    fn expired_entry_is_not_deleted() {
        let cache = ResponseCache::new();
        let t0 = Instant::now();
        cache.put_at("k", response("v", None), MINUTE, t0);

        let later = t0 + Duration::from_secs(120);
        assert!(cache.get_at("k", MINUTE, later).is_none());
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("k", Duration::from_secs(300), later).is_some());
    }

    #[test]
    fn put_replaces_rather_than_merges() {
        let cache = ResponseCache::new();
        let t0 = Instant::now();
        cache.put_at("k", response("old", Some("text/plain")), MINUTE, t0);
        cache.put_at(
            "k",
            CachedResponse {
                truncated_at: Some(3),
                ..response("new", None)
            },
            MINUTE,
            t0 + Duration::from_secs(1),
        );

        let hit = cache.get_at("k", Duration::from_secs(5), t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(hit.body, "new");
        assert_eq!(hit.content_type, None);
        assert_eq!(hit.truncated_at, Some(3));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn miss_for_unknown_key() {
        let cache = ResponseCache::new();
        assert!(cache.get("missing", MINUTE).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn over_capacity_drops_stale_entries_first() {
        let cache = ResponseCache::with_capacity(2);
        let t0 = Instant::now();
        cache.put_at("old", response("a", None), Duration::from_secs(1), t0);
        cache.put_at("kept", response("b", None), MINUTE, t0);

        let later = t0 + Duration::from_secs(10);
        cache.put_at("new", response("c", None), MINUTE, later);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("old", Duration::from_secs(3600), later).is_none());
        assert!(cache.get_at("kept", MINUTE, later).is_some());
        assert!(cache.get_at("new", MINUTE, later).is_some());
    }

    #[test]
    fn over_capacity_drops_oldest_when_all_fresh() {
        let cache = ResponseCache::with_capacity(2);
        let t0 = Instant::now();
        for (i, url) in ["https://a.test/1", "https://a.test/2", "https://a.test/3", "https://a.test/4"]
            .into_iter()
            .enumerate()
        {
            cache.put_at(url, response(url, None), MINUTE, t0 + Duration::from_secs(i as u64));
        }

        let now = t0 + Duration::from_secs(5);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("https://a.test/1", MINUTE, now).is_none());
        assert!(cache.get_at("https://a.test/2", MINUTE, now).is_none());
        assert_eq!(cache.get_at("https://a.test/4", MINUTE, now).unwrap().body, "https://a.test/4");
    }

    #[test]
    fn zero_capacity_still_holds_latest() {
        let cache = ResponseCache::with_capacity(0);
        let t0 = Instant::now();
        cache.put_at("a", response("1", None), MINUTE, t0);
        cache.put_at("b", response("2", None), MINUTE, t0 + Duration::from_secs(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("b", MINUTE, t0 + Duration::from_secs(1)).is_some());
    }
}
