//! Memoization Cache
//!
//! The router memoizes catalogue reads and the driver cache memoizes pool
//! descriptors through the [`Cache`] trait, so a deployment can swap the
//! process-local [`MemoryCache`] for a shared backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Key/value cache with optional per-entry expiry
#[async_trait]
pub trait Cache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Fetch a live value
    async fn get(&self, key: &str) -> Option<V>;

    /// Store a value; `None` keeps it until invalidated
    async fn set(&self, key: &str, value: V, ttl: Option<Duration>);

    /// Drop a single key
    async fn invalidate(&self, key: &str);

    /// Drop every key
    async fn clear(&self);

    /// Drop expired entries, returning how many went
    ///
    /// Backends that expire entries on their own can keep the default.
    async fn purge_expired(&self) -> usize {
        0
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process [`Cache`] backed by a `DashMap`
///
/// Expired entries are dropped lazily on read, or in bulk by
/// [`Cache::purge_expired`].
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V> MemoryCache<V> {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

#[async_trait]
impl<V> Cache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    async fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn clear(&self) {
        self.entries.clear();
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_invalidate() {
        let cache = MemoryCache::new();
        cache.set("k", 7u32, None).await;
        assert_eq!(cache.get("k").await, Some(7));

        cache.invalidate("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache = MemoryCache::new();
        cache.set("k", "v".to_string(), Some(Duration::ZERO)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.set("old", 1u8, Some(Duration::ZERO)).await;
        cache.set("new", 2u8, Some(Duration::from_secs(60))).await;
        cache.set("forever", 3u8, None).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len(), 2);

        cache.clear().await;
        assert!(cache.is_empty());
    }
}
