//! In-memory TTL + LRU caching for extraction and validation results.
//!
//! [`TtlLruCache`] is a bounded store keyed by normalized URLs. Entries expire
//! lazily: an entry past its TTL is removed the next time it is touched and
//! reported as a miss, there is no background sweep (callers wanting an eager
//! sweep call [`prune`](TtlLruCache::prune)). When the cache is full, `set`
//! first drops expired entries and only then evicts from the
//! least-recently-used end.
//!
//! The cache is an optimization, never a correctness dependency: no operation
//! can fail, and a caller cannot distinguish "absent" from "internal problem".
//!
//! ```rust
//! use docpull_core::cache::TtlLruCache;
//!
//! let cache: TtlLruCache<String> = TtlLruCache::for_extractions();
//! cache.set("https://example.com/docs", "cached markdown".to_string());
//!
//! // Host case and trailing slashes do not matter for lookups.
//! assert!(cache.get("HTTPS://EXAMPLE.com/docs/").is_some());
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::trace;
use url::Url;

/// Default TTL for extraction results.
const EXTRACTION_TTL: Duration = Duration::from_secs(5 * 60);
/// Default capacity for extraction results.
const EXTRACTION_CAPACITY: usize = 100;
/// Default TTL for validation results.
const VALIDATION_TTL: Duration = Duration::from_secs(2 * 60);
/// Default capacity for validation results.
const VALIDATION_CAPACITY: usize = 200;

/// A single cached value with its insertion time and TTL.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Observable cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing (or only an expired entry).
    pub misses: u64,
    /// Entries removed to make room at capacity.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
    /// Current number of stored entries (live or not yet noticed as expired).
    pub size: usize,
    /// Maximum number of entries.
    pub capacity: usize,
}

#[derive(Debug, Default)]
struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU order: front = least recently used, back = most recently used.
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> CacheInner<V> {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.entries.remove(key)
    }
}

/// Bounded in-memory cache with per-entry TTL and LRU eviction.
///
/// Interior locking uses a plain `std::sync::Mutex`: no critical section ever
/// awaits, so one instance can be shared across concurrent extractions
/// without an async lock (spec'd concurrency model in the module docs).
#[derive(Debug)]
pub struct TtlLruCache<V> {
    inner: Mutex<CacheInner<V>>,
    default_ttl: Duration,
    capacity: usize,
}

impl<V: Clone> TtlLruCache<V> {
    /// Creates a cache with the given capacity and default TTL.
    #[must_use]
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            default_ttl,
            capacity: capacity.max(1),
        }
    }

    /// Preset for extraction results: 5 minute TTL, 100 entries.
    #[must_use]
    pub fn for_extractions() -> Self {
        Self::new(EXTRACTION_CAPACITY, EXTRACTION_TTL)
    }

    /// Preset for validation results: 2 minute TTL, 200 entries.
    #[must_use]
    pub fn for_validations() -> Self {
        Self::new(VALIDATION_CAPACITY, VALIDATION_TTL)
    }

    /// Looks up a key, promoting a live hit to most-recently-used.
    ///
    /// An entry whose TTL has elapsed is deleted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Clock-injectable variant of [`get`](Self::get).
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let key = normalize_cache_key(key);
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };

        match inner.entries.get(&key) {
            Some(entry) if entry.is_expired(now) => {
                inner.remove(&key);
                inner.expirations += 1;
                inner.misses += 1;
                trace!(key = %key, "Cache entry expired on access");
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                inner.hits += 1;
                inner.touch(&key);
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Stores a value under the default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl_at(key, value, self.default_ttl, Instant::now());
    }

    /// Stores a value with an explicit TTL.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        self.set_with_ttl_at(key, value, ttl, Instant::now());
    }

    /// Clock-injectable variant of [`set_with_ttl`](Self::set_with_ttl).
    ///
    /// At capacity, expired entries are pruned first; only if the cache is
    /// still full is the least-recently-used entry evicted.
    pub fn set_with_ttl_at(&self, key: &str, value: V, ttl: Duration, now: Instant) {
        let key = normalize_cache_key(key);
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            // Prefer dropping dead entries over evicting live ones.
            let expired: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, e)| e.is_expired(now))
                .map(|(k, _)| k.clone())
                .collect();
            for k in expired {
                inner.remove(&k);
                inner.expirations += 1;
            }

            while inner.entries.len() >= self.capacity {
                let Some(lru) = inner.order.front().cloned() else {
                    break;
                };
                inner.remove(&lru);
                inner.evictions += 1;
                trace!(key = %lru, "Evicted least-recently-used cache entry");
            }
        }

        inner.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                inserted_at: now,
                ttl,
            },
        );
        inner.touch(&key);
    }

    /// Whether a live entry exists for the key.
    ///
    /// Expired entries are removed but the LRU order of live entries is not
    /// changed, so `has` never protects a key from eviction.
    pub fn has(&self, key: &str) -> bool {
        self.has_at(key, Instant::now())
    }

    /// Clock-injectable variant of [`has`](Self::has).
    pub fn has_at(&self, key: &str, now: Instant) -> bool {
        let key = normalize_cache_key(key);
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        match inner.entries.get(&key) {
            Some(entry) if entry.is_expired(now) => {
                inner.remove(&key);
                inner.expirations += 1;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Removes a key. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        let key = normalize_cache_key(key);
        self.inner
            .lock()
            .map(|mut inner| inner.remove(&key).is_some())
            .unwrap_or(false)
    }

    /// Removes all entries. Counters are kept.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
            inner.order.clear();
        }
    }

    /// Eagerly removes every expired entry, returning how many were dropped.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    /// Clock-injectable variant of [`prune`](Self::prune).
    pub fn prune_at(&self, now: Instant) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        let count = expired.len();
        for k in expired {
            inner.remove(&k);
            inner.expirations += 1;
        }
        count
    }

    /// Current counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        self.inner
            .lock()
            .map(|inner| CacheStats {
                hits: inner.hits,
                misses: inner.misses,
                evictions: inner.evictions,
                expirations: inner.expirations,
                size: inner.entries.len(),
                capacity: self.capacity,
            })
            .unwrap_or_default()
    }

    /// Remaining TTL for a live entry, `None` when absent or expired.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.ttl_remaining_at(key, Instant::now())
    }

    /// Clock-injectable variant of [`ttl_remaining`](Self::ttl_remaining).
    pub fn ttl_remaining_at(&self, key: &str, now: Instant) -> Option<Duration> {
        let key = normalize_cache_key(key);
        let inner = self.inner.lock().ok()?;
        let entry = inner.entries.get(&key)?;
        let age = now.duration_since(entry.inserted_at);
        entry.ttl.checked_sub(age).filter(|d| !d.is_zero())
    }
}

/// Normalizes a cache key so equivalent URLs collide.
///
/// Lowercases the host, strips the trailing slash from the path, and drops
/// query and fragment: `HTTPS://X.com/a/?q=1` and `https://x.com/a` map to
/// the same key. Non-URL keys are used verbatim.
#[must_use]
pub fn normalize_cache_key(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(host) = url.host_str() else {
        return raw.to_string();
    };

    let scheme = url.scheme().to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    let path = url.path().trim_end_matches('/');

    match url.port() {
        Some(port) => format!("{scheme}://{host}:{port}{path}"),
        None => format!("{scheme}://{host}{path}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let cache = TtlLruCache::new(4, Duration::from_secs(60));
        cache.set("https://example.com/a", 1);
        assert_eq!(cache.get("https://example.com/a"), Some(1));
    }

    #[test]
    fn keys_are_normalized() {
        let cache = TtlLruCache::new(4, Duration::from_secs(60));
        cache.set("HTTPS://X.com/a/", 7);
        assert_eq!(cache.get("https://x.com/a"), Some(7));
        assert_eq!(cache.get("https://x.com/a?query=dropped"), Some(7));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = TtlLruCache::new(4, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.set_with_ttl_at("https://example.com/a", 1, Duration::from_secs(10), t0);

        let before = t0 + Duration::from_secs(9);
        assert_eq!(cache.get_at("https://example.com/a", before), Some(1));

        let after = t0 + Duration::from_secs(10);
        assert_eq!(cache.get_at("https://example.com/a", after), None);

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn insert_past_capacity_evicts_exactly_one() {
        let cache = TtlLruCache::new(3, Duration::from_secs(60));
        cache.set("https://example.com/1", 1);
        cache.set("https://example.com/2", 2);
        cache.set("https://example.com/3", 3);
        cache.set("https://example.com/4", 4);

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 3);
        // Oldest entry went first.
        assert_eq!(cache.get("https://example.com/1"), None);
        assert_eq!(cache.get("https://example.com/4"), Some(4));
    }

    #[test]
    fn get_promotes_key_out_of_eviction_slot() {
        let cache = TtlLruCache::new(3, Duration::from_secs(60));
        cache.set("https://example.com/1", 1);
        cache.set("https://example.com/2", 2);
        cache.set("https://example.com/3", 3);

        // Touching /1 makes /2 the LRU victim.
        assert_eq!(cache.get("https://example.com/1"), Some(1));
        cache.set("https://example.com/4", 4);

        assert_eq!(cache.get("https://example.com/1"), Some(1));
        assert_eq!(cache.get("https://example.com/2"), None);
    }

    #[test]
    fn set_prunes_expired_before_evicting_live() {
        let cache = TtlLruCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.set_with_ttl_at("https://example.com/dead", 0, Duration::from_secs(1), t0);
        cache.set_with_ttl_at("https://example.com/live", 1, Duration::from_secs(60), t0);

        // /dead has expired but was never accessed; inserting at capacity
        // must reclaim it rather than evict /live.
        let later = t0 + Duration::from_secs(30);
        cache.set_with_ttl_at("https://example.com/new", 2, Duration::from_secs(60), later);

        assert_eq!(cache.get_at("https://example.com/live", later), Some(1));
        assert_eq!(cache.get_at("https://example.com/new", later), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn delete_and_clear() {
        let cache = TtlLruCache::new(4, Duration::from_secs(60));
        cache.set("https://example.com/a", 1);
        assert!(cache.delete("https://example.com/a"));
        assert!(!cache.delete("https://example.com/a"));

        cache.set("https://example.com/b", 2);
        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn prune_removes_only_expired() {
        let cache = TtlLruCache::new(4, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.set_with_ttl_at("https://example.com/a", 1, Duration::from_secs(5), t0);
        cache.set_with_ttl_at("https://example.com/b", 2, Duration::from_secs(500), t0);

        let later = t0 + Duration::from_secs(10);
        assert_eq!(cache.prune_at(later), 1);
        assert_eq!(cache.get_at("https://example.com/b", later), Some(2));
    }

    #[test]
    fn ttl_remaining_counts_down() {
        let cache = TtlLruCache::new(4, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.set_with_ttl_at("https://example.com/a", 1, Duration::from_secs(100), t0);

        let later = t0 + Duration::from_secs(40);
        let remaining = cache.ttl_remaining_at("https://example.com/a", later).unwrap();
        assert_eq!(remaining, Duration::from_secs(60));

        let way_later = t0 + Duration::from_secs(200);
        assert!(cache.ttl_remaining_at("https://example.com/a", way_later).is_none());
    }

    #[test]
    fn presets_match_contract() {
        let extraction: TtlLruCache<u8> = TtlLruCache::for_extractions();
        assert_eq!(extraction.stats().capacity, 100);
        let validation: TtlLruCache<u8> = TtlLruCache::for_validations();
        assert_eq!(validation.stats().capacity, 200);
    }

    #[test]
    fn non_url_keys_pass_through() {
        assert_eq!(normalize_cache_key("not a url"), "not a url");
        assert_eq!(
            normalize_cache_key("https://Example.com:8080/Docs/"),
            "https://example.com:8080/Docs"
        );
    }
}
