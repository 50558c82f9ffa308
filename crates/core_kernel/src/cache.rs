//! In-memory TTL cache
//!
//! A small map whose entries expire after a fixed time-to-live. The API
//! server keeps dashboard aggregates here so repeated page loads do not
//! re-run the aggregate queries.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe map with per-entry expiry
///
/// Cloning the cache is cheap and yields a handle to the same storage.
/// Every `invalidate` or `clear` bumps a generation counter; a load that
/// started before the bump does not store its result.
///
/// # Example
///
/// ```rust
/// use core_kernel::TtlCache;
/// use std::time::Duration;
///
/// let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
/// cache.insert("leads", 42);
/// assert_eq!(cache.get(&"leads"), Some(42));
/// ```
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    generation: Arc<AtomicU64>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a live value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    /// Inserts or replaces a value, restarting its TTL
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Returns the cached value or computes, stores, and returns a fresh one
    ///
    /// The lock is not held while `load` runs, so two concurrent misses may
    /// both load; the later insert wins. If the cache was invalidated while
    /// `load` ran, the value is returned but not stored.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let started = self.generation.load(Ordering::Acquire);
        let value = load().await?;

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::Acquire) == started {
            entries.insert(
                key,
                Entry {
                    value: value.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        Ok(value)
    }

    /// Removes a single entry
    pub fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Removes every entry
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops expired entries and returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(30));
        let start = Instant::now();
        cache.insert_at("stats", 7, start);

        assert_eq!(cache.get_at(&"stats", start + Duration::from_secs(29)), Some(7));
        assert_eq!(cache.get_at(&"stats", start + Duration::from_secs(30)), None);
    }

    #[test]
    fn test_clear_and_invalidate() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);

        cache.invalidate(&"a");
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("gone", 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_try_insert_with_loads_once() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));

        let first: Result<u32, ()> = cache.get_or_try_insert_with("k", || async { Ok(1) }).await;
        let second: Result<u32, ()> = cache.get_or_try_insert_with("k", || async { Ok(2) }).await;

        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(1));
    }

    #[tokio::test]
    async fn test_clear_during_load_discards_loaded_value() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let loader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_try_insert_with("stats", || async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<u32, ()>(1)
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        cache.clear();
        release_tx.send(()).unwrap();

        assert_eq!(loader.await.unwrap(), Ok(1));
        assert_eq!(cache.get(&"stats"), None);

        // The next load after the clear is stored as usual
        let fresh: Result<u32, ()> = cache.get_or_try_insert_with("stats", || async { Ok(2) }).await;
        assert_eq!(fresh, Ok(2));
        assert_eq!(cache.get(&"stats"), Some(2));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));

        let failed: Result<u32, &str> = cache.get_or_try_insert_with("k", || async { Err("db down") }).await;
        assert!(failed.is_err());
        assert!(cache.get(&"k").is_none());
    }
}
