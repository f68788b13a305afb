//! Generic TTL cache with request coalescing.
//!
//! [`TtlCache`] backs the remote JWKS client but is deliberately
//! generic: it maps hashable keys to cloneable values, each with an
//! optional expiry. Expired entries are dropped lazily on read; there
//! is no background eviction task.
//!
//! # Request coalescing
//!
//! [`TtlCache::get_or_insert_with`] guarantees that concurrent callers
//! for the same missing or expired key share a single producer run.
//! Callers for other keys are never blocked. A failing producer writes
//! nothing, so the next caller retries it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

/// Cached value with optional expiry.
struct CacheEntry<V> {
    value: V,
    /// `None` means the entry lives until explicit invalidation.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// In-memory TTL cache with per-key request coalescing.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    /// Per-key producer locks. Entries are removed once the producer
    /// finishes so the map does not grow unboundedly.
    inflight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key` if present and fresh.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Stale entry: drop it so the map does not accumulate garbage.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key)
            && !entry.is_fresh(now)
        {
            entries.remove(key);
        }
        None
    }

    /// Returns the cached value for `key`, running `producer` on a
    /// miss or stale entry.
    ///
    /// The producer returns the value together with its TTL; `None`
    /// caches until explicit invalidation. Concurrent callers for the
    /// same key await a single producer run and then read the freshly
    /// written entry.
    ///
    /// # Errors
    ///
    /// Propagates the producer's error. Nothing is cached on failure.
    pub async fn get_or_insert_with<E, F, Fut>(&self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(V, Option<Duration>), E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        let _guard = lock.lock().await;

        // Another coalesced caller may have produced while we waited.
        if let Some(value) = self.get(&key).await {
            self.release_inflight(&key, &lock).await;
            return Ok(value);
        }

        let result = producer().await;

        if let Ok((value, ttl)) = &result {
            let mut entries = self.entries.write().await;
            entries.insert(
                key.clone(),
                CacheEntry {
                    value: value.clone(),
                    expires_at: ttl.map(|ttl| Instant::now() + ttl),
                },
            );
        }

        self.release_inflight(&key, &lock).await;
        result.map(|(value, _)| value)
    }

    /// Drops the per-key lock entry once no other caller holds it.
    async fn release_inflight(&self, key: &K, lock: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        // Two strong refs: the map's and ours. Anything higher means
        // another caller is still queued on this key.
        if Arc::strong_count(lock) <= 2 {
            inflight.remove(key);
        }
    }

    /// Removes the entry for `key`, fresh or not.
    pub async fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }

    /// Removes all entries.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Returns the number of entries, including stale ones not yet
    /// dropped.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_get_miss_and_hit() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        assert_eq!(cache.get(&"a".to_string()).await, None);

        let value = cache
            .get_or_insert_with("a".to_string(), || async {
                Ok::<_, ()>((7, Some(Duration::from_secs(60))))
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(cache.get(&"a".to_string()).await, Some(7));
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        cache
            .get_or_insert_with("a".to_string(), || async {
                Ok::<_, ()>((1, Some(Duration::ZERO)))
            })
            .await
            .unwrap();

        assert_eq!(cache.get(&"a".to_string()).await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_none_ttl_never_expires() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        cache
            .get_or_insert_with("a".to_string(), || async { Ok::<_, ()>((1, None)) })
            .await
            .unwrap();

        assert_eq!(cache.get(&"a".to_string()).await, Some(1));

        cache.invalidate(&"a".to_string()).await;
        assert_eq!(cache.get(&"a".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_failed_producer_writes_nothing() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let result = cache
            .get_or_insert_with("a".to_string(), || async { Err::<(u32, _), _>("boom") })
            .await;
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty().await);

        // The key is retriable after a failure.
        let value = cache
            .get_or_insert_with("a".to_string(), || async {
                Ok::<_, &str>((9, Some(Duration::from_secs(60))))
            })
            .await
            .unwrap();
        assert_eq!(value, 9);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_producer_run() {
        let cache: Arc<TtlCache<String, u32>> = Arc::new(TtlCache::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let runs = Arc::clone(&runs);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_insert_with("k".to_string(), || async {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ()>((42, Some(Duration::from_secs(60))))
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_independent_keys_do_not_block() {
        let cache: Arc<TtlCache<String, u32>> = Arc::new(TtlCache::new());

        let slow = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_insert_with("slow".to_string(), || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, ()>((1, None))
                    })
                    .await
                    .unwrap()
            })
        };

        // A different key resolves while the slow producer runs.
        let fast = cache
            .get_or_insert_with("fast".to_string(), || async { Ok::<_, ()>((2, None)) })
            .await
            .unwrap();
        assert_eq!(fast, 2);
        assert_eq!(slow.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        for key in ["a", "b"] {
            cache
                .get_or_insert_with(key.to_string(), || async { Ok::<_, ()>((0, None)) })
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
