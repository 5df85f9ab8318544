//! Keyed LRU Store Module
//!
//! Thread-safe bounded cache combining hash map storage with LRU tracking.

use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, LruTracker};

#[derive(Debug)]
struct Inner<K, V> {
    /// Key-value storage
    entries: HashMap<K, V, RandomState>,
    /// LRU access tracker, always holding exactly the keys of `entries`
    lru: LruTracker<K>,
    stats: CacheStats,
}

// == Keyed LRU ==
/// Bounded map with least-recently-used eviction, safe to share across threads.
///
/// Every operation runs inside one short critical section. A `get` updates
/// recency, so reads are serialized with writes as well.
#[derive(Debug)]
pub struct KeyedLru<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
}

impl<K, V> KeyedLru<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// # Panics
    /// A zero capacity is a configuration error and panics.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be at least 1");

        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
                lru: LruTracker::with_capacity(capacity),
                stats: CacheStats::new(capacity),
            }),
            capacity,
        }
    }

    // == Get ==
    /// Returns the cached value and marks it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let Inner { entries, lru, stats } = &mut *inner;

        match entries.get(key) {
            Some(value) => {
                stats.record_hit();
                lru.touch(key);
                Some(value.clone())
            }
            None => {
                stats.record_miss();
                None
            }
        }
    }

    // == Peek ==
    /// Returns the cached value without touching recency or statistics.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().entries.get(key).cloned()
    }

    // == Put ==
    /// Inserts or overwrites an entry and marks it most recently used.
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry, which is returned. Overwriting never changes the entry count.
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        let mut inner = self.inner.lock();
        let Inner { entries, lru, stats } = &mut *inner;

        let mut evicted = None;
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            if let Some(oldest) = lru.evict_oldest() {
                if let Some(old_value) = entries.remove(&oldest) {
                    debug!(key = ?oldest, "evicted least recently used entry");
                    stats.record_eviction();
                    evicted = Some((oldest, old_value));
                }
            }
        }

        lru.touch(&key);
        entries.insert(key, value);
        evicted
    }

    // == Evict ==
    /// Removes an entry if present. Absent keys are a no-op.
    pub fn evict(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(key);
        if removed.is_some() {
            inner.lru.remove(key);
        }
        removed
    }

    // == Contains ==
    /// Checks membership without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry. Statistics are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.lru.clear();
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.inner.lock().lru.iter().cloned().collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.total_entries = inner.entries.len();
        stats
    }
}
