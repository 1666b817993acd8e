//! Expiring cache backed by a sharded concurrent map.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::observability::metrics;

/// TTL applied by [`ExpiringCache::set_default`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when `now + ttl` overflows; such entries never expire.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// A thread-safe cache whose entries expire after a per-entry TTL.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Debug)]
pub struct ExpiringCache<K, V>
where
    K: Eq + Hash,
{
    inner: Arc<DashMap<K, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<K, V> Clone for ExpiringCache<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            default_ttl: self.default_ttl,
        }
    }
}

impl<K, V> Default for ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache using [`DEFAULT_TTL`].
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    /// Create an empty cache with a custom default TTL.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store `value` under `key`, replacing any existing entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        self.inner.insert(key, CacheEntry::new(value, Instant::now(), ttl));
        metrics::record_cache_size(self.inner.len());
    }

    /// Store `value` under `key` with the cache's default TTL.
    pub fn set_default(&self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Return the value for `key` if present and not yet expired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let expired = match self.inner.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                metrics::record_cache_hit();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        // The read guard is released here; a concurrent `set` may already have
        // replaced the entry, so only remove it if it is still expired.
        if expired && self.inner.remove_if(key, |_, entry| entry.is_expired(now)).is_some() {
            tracing::debug!("evicted expired cache entry");
            metrics::record_cache_evictions(1);
            metrics::record_cache_size(self.inner.len());
        }
        metrics::record_cache_miss();
        None
    }

    /// Whether a live entry exists for `key`. Evicts it if expired.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Return the live value for `key`, or compute, store and return it.
    ///
    /// `init` runs while the key's shard is locked and must not call back
    /// into this cache.
    pub fn get_or_insert_with<F>(&self, key: K, ttl: Duration, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = Instant::now();
        let value = match self.inner.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    let value = init();
                    occupied.insert(CacheEntry::new(value.clone(), now, ttl));
                    metrics::record_cache_evictions(1);
                    metrics::record_cache_miss();
                    value
                } else {
                    metrics::record_cache_hit();
                    occupied.get().value.clone()
                }
            }
            Entry::Vacant(vacant) => {
                let value = init();
                vacant.insert(CacheEntry::new(value.clone(), now, ttl));
                metrics::record_cache_miss();
                value
            }
        };
        metrics::record_cache_size(self.inner.len());
        value
    }

    /// Remove the entry for `key`. No-op if absent.
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.inner.remove(key).is_some() {
            metrics::record_cache_size(self.inner.len());
        }
    }

    /// Remove every entry whose key matches `predicate`.
    pub fn remove_where<F>(&self, mut predicate: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.inner.retain(|key, _| !predicate(key));
        metrics::record_cache_size(self.inner.len());
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
    }

    /// Snapshot of all live entries. Expired entries observed are evicted.
    pub fn scan(&self) -> Vec<(K, V)> {
        let now = Instant::now();
        let mut live = Vec::new();
        let mut evicted = 0;
        self.inner.retain(|key, entry| {
            if entry.is_expired(now) {
                evicted += 1;
                false
            } else {
                live.push((key.clone(), entry.value.clone()));
                true
            }
        });
        metrics::record_cache_evictions(evicted);
        metrics::record_cache_size(self.inner.len());
        live
    }

    /// Physically drop every expired entry. Returns how many were removed.
    ///
    /// Never called implicitly; hosts that set many keys they never read
    /// again can invoke it periodically.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let evicted = before.saturating_sub(self.inner.len());
        metrics::record_cache_evictions(evicted);
        metrics::record_cache_size(self.inner.len());
        evicted
    }

    /// Number of physically present entries, including expired ones not yet
    /// observed by a read.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_set_then_get() {
        let cache = ExpiringCache::new();
        assert!(cache.get("missing").is_none());

        cache.set("k".to_string(), 42, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(42));
        assert!(cache.contains("k"));
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let cache = ExpiringCache::new();
        cache.set("k".to_string(), "first", Duration::from_secs(60));
        cache.set("k".to_string(), "second", Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_does_not_resurrect() {
        let cache = ExpiringCache::new();
        cache.set("k".to_string(), 1, Duration::from_millis(20));
        assert_eq!(cache.get("k"), Some(1));

        thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0, "expired entry should be evicted on read");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let cache = ExpiringCache::new();
        cache.set("k".to_string(), 1, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache = ExpiringCache::new();
        cache.set("k".to_string(), 1, Duration::MAX);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ExpiringCache::new();
        cache.set_default("a".to_string(), 1);
        cache.set_default("b".to_string(), 2);

        cache.remove("a");
        cache.remove("never-set");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_where() {
        let cache = ExpiringCache::new();
        cache.set_default(("a".to_string(), 1), 1);
        cache.set_default(("a".to_string(), 2), 2);
        cache.set_default(("b".to_string(), 1), 3);

        cache.remove_where(|(name, _)| name == "a");
        assert_eq!(cache.scan(), vec![(("b".to_string(), 1), 3)]);
    }

    #[test]
    fn test_default_ttl() {
        let cache: ExpiringCache<String, u8> = ExpiringCache::new();
        assert_eq!(cache.default_ttl(), Duration::from_secs(1800));

        let short = ExpiringCache::with_default_ttl(Duration::from_millis(10));
        short.set_default("k".to_string(), 1u8);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(short.get("k"), None);
    }

    #[test]
    fn test_get_or_insert_with_memoizes() {
        let cache = ExpiringCache::new();
        let mut calls = 0;
        let first = cache.get_or_insert_with("k".to_string(), Duration::from_secs(60), || {
            calls += 1;
            "computed".to_string()
        });
        let second = cache.get_or_insert_with("k".to_string(), Duration::from_secs(60), || {
            calls += 1;
            "recomputed".to_string()
        });
        assert_eq!(first, "computed");
        assert_eq!(second, "computed");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_get_or_insert_with_recomputes_after_expiry() {
        let cache = ExpiringCache::new();
        cache.set("k".to_string(), 1, Duration::from_millis(10));
        thread::sleep(Duration::from_millis(30));
        let value = cache.get_or_insert_with("k".to_string(), Duration::from_secs(60), || 2);
        assert_eq!(value, 2);
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn test_scan_skips_and_evicts_expired() {
        let cache = ExpiringCache::new();
        cache.set("live".to_string(), 1, Duration::from_secs(60));
        cache.set("stale".to_string(), 2, Duration::from_millis(10));
        thread::sleep(Duration::from_millis(30));

        let entries = cache.scan();
        assert_eq!(entries, vec![("live".to_string(), 1)]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let cache = ExpiringCache::new();
        for i in 0..5 {
            cache.set(i, i, Duration::from_millis(10));
        }
        cache.set(99, 99, Duration::from_secs(60));
        thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.len(), 6, "expiry is lazy");
        assert_eq!(cache.purge_expired(), 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ExpiringCache::new();
        let other = cache.clone();
        cache.set("k".to_string(), 7, Duration::from_secs(60));
        assert_eq!(other.get("k"), Some(7));
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let cache: ExpiringCache<String, usize> = ExpiringCache::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("key-{}", i % 16);
                        cache.set(key.clone(), t * 1000 + i, Duration::from_secs(60));
                        if let Some(v) = cache.get(&key) {
                            assert!(v < 8000);
                        }
                        if i % 50 == 0 {
                            cache.remove(&key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 16);
    }
}
