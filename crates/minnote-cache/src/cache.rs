//! Content cache

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

use crate::key::CacheKey;

/// Fixed limits for a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries held at once
    pub capacity: usize,
    /// Age after which an entry reads as a miss
    pub expiry: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            expiry: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    content: String,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct ContentCache {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<CacheKey>,
    config: CacheConfig,
}

impl ContentCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            config,
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Look up fresh contents for `key`.
    ///
    /// Expired entries are reported as misses but left in place.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let entry = self.entries.get(key)?;

        if entry.inserted_at.elapsed() >= self.config.expiry {
            tracing::trace!(key = %key, "Cache entry expired");
            return None;
        }

        Some(entry.content.clone())
    }

    /// Insert or overwrite contents for `key`.
    ///
    /// Overwriting counts as a fresh insertion: the entry moves to the back
    /// of the eviction order and its age restarts.
    pub fn put(&mut self, key: CacheKey, content: String) {
        if self.config.capacity == 0 {
            return;
        }

        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                content,
                inserted_at: Instant::now(),
            },
        );
        self.order.push_back(key);

        if self.entries.len() > self.config.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(key = %oldest, "Evicted oldest cache entry");
            }
        }
    }

    /// Drop the entry for `key`, if any
    pub fn remove(&mut self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize, expiry: Duration) -> ContentCache {
        ContentCache::new(CacheConfig { capacity, expiry })
    }

    #[test]
    fn test_fifo_eviction() {
        let mut cache = cache(2, Duration::from_secs(60));

        cache.put(CacheKey::session("k1"), "one".to_string());
        cache.put(CacheKey::session("k2"), "two".to_string());
        cache.put(CacheKey::session("k3"), "three".to_string());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&CacheKey::session("k1")), None);
        assert_eq!(cache.get(&CacheKey::session("k2")).as_deref(), Some("two"));
        assert_eq!(cache.get(&CacheKey::session("k3")).as_deref(), Some("three"));
    }

    #[test]
    fn test_reads_do_not_affect_eviction_order() {
        let mut cache = cache(2, Duration::from_secs(60));

        cache.put(CacheKey::session("k1"), "one".to_string());
        cache.put(CacheKey::session("k2"), "two".to_string());
        // A read would save k1 under LRU; FIFO ignores it
        assert!(cache.get(&CacheKey::session("k1")).is_some());
        cache.put(CacheKey::session("k3"), "three".to_string());

        assert_eq!(cache.get(&CacheKey::session("k1")), None);
        assert!(cache.get(&CacheKey::session("k2")).is_some());
    }

    #[test]
    fn test_overwrite_moves_entry_to_back() {
        let mut cache = cache(2, Duration::from_secs(60));

        cache.put(CacheKey::session("k1"), "one".to_string());
        cache.put(CacheKey::session("k2"), "two".to_string());
        cache.put(CacheKey::session("k1"), "uno".to_string());
        cache.put(CacheKey::session("k3"), "three".to_string());

        assert_eq!(cache.get(&CacheKey::session("k1")).as_deref(), Some("uno"));
        assert_eq!(cache.get(&CacheKey::session("k2")), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cache = cache(4, Duration::from_secs(60));
        let key = CacheKey::path("notes/a.txt");

        cache.put(key.clone(), "a".to_string());
        cache.remove(&key);
        cache.remove(&key);

        assert!(cache.is_empty());
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = cache(0, Duration::from_secs(60));
        cache.put(CacheKey::session("k1"), "one".to_string());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry() {
        let mut cache = cache(4, Duration::from_secs(5));
        let key = CacheKey::session("k1");
        cache.put(key.clone(), "one".to_string());

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get(&key).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&key), None);
        // Still held until something else removes it
        assert_eq!(cache.len(), 1);

        cache.put(key.clone(), "fresh".to_string());
        assert_eq!(cache.get(&key).as_deref(), Some("fresh"));
    }
}
