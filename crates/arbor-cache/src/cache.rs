//! The fetch-through LRU cache.

use std::borrow::Borrow;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use crate::stats::{CacheStats, ConcurrentStatsCounter, StatsCounter};

/// What the cache holds for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot<V> {
    Value(V),
    /// The source confirmed a mapping whose value is null.
    Null,
}

/// Outcome of a lookup through the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetched<V> {
    /// A mapping exists and holds this value.
    Value(V),
    /// A mapping exists but its value is null.
    Null,
    /// No mapping exists.
    Absent,
}

impl<V> Fetched<V> {
    /// `true` for [`Fetched::Value`] and [`Fetched::Null`].
    pub fn exists(&self) -> bool {
        !matches!(self, Fetched::Absent)
    }

    /// The value, collapsing null and absent to `None`.
    pub fn into_value(self) -> Option<V> {
        match self {
            Fetched::Value(value) => Some(value),
            Fetched::Null | Fetched::Absent => None,
        }
    }
}

impl<V> From<Slot<V>> for Fetched<V> {
    fn from(slot: Slot<V>) -> Self {
        match slot {
            Slot::Value(value) => Fetched::Value(value),
            Slot::Null => Fetched::Null,
        }
    }
}

/// A bounded, least-recently-used cache that records hit, miss, load and
/// eviction statistics.
///
/// The cache never talks to a data source on its own. Callers pass a fetcher
/// and an existence check to [`fetch`](StatsCache::fetch); the pair lets the
/// cache tell "present but null" apart from "absent". A confirmed null is
/// cached as a marker, an absent key is never cached.
///
/// All methods take `&self`. The internal lock is not held while a fetcher
/// runs, so a fetcher may itself use the cache.
pub struct StatsCache<K, V> {
    entries: Mutex<LruCache<K, Slot<V>>>,
    stats: Arc<dyn StatsCounter>,
}

impl<K: Hash + Eq, V: Clone> StatsCache<K, V> {
    /// Create a cache holding at most `capacity` entries, counting with a
    /// fresh [`ConcurrentStatsCounter`].
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self::with_stats_counter(capacity, Arc::new(ConcurrentStatsCounter::new()))
    }

    pub fn with_stats_counter(capacity: NonZeroUsize, stats: Arc<dyn StatsCounter>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats,
        }
    }

    /// Look `key` up, falling back to `fetcher` on a miss.
    ///
    /// When the fetcher returns `None`, `exists` decides between a null
    /// mapping (cached as a marker, reported as [`Fetched::Null`]) and no
    /// mapping at all ([`Fetched::Absent`], recorded as a load failure and
    /// not cached).
    pub fn fetch(
        &self,
        key: K,
        fetcher: impl FnOnce(&K) -> Option<V>,
        exists: impl FnOnce(&K) -> bool,
    ) -> Fetched<V> {
        let result = self.try_fetch(
            key,
            |k| Ok::<_, Infallible>(fetcher(k)),
            |k| Ok(exists(k)),
        );
        match result {
            Ok(fetched) => fetched,
            Err(never) => match never {},
        }
    }

    /// [`fetch`](StatsCache::fetch) with fallible callbacks. An error from
    /// either callback is recorded as a load failure and returned as is;
    /// nothing is cached.
    pub fn try_fetch<E>(
        &self,
        key: K,
        fetcher: impl FnOnce(&K) -> Result<Option<V>, E>,
        exists: impl FnOnce(&K) -> Result<bool, E>,
    ) -> Result<Fetched<V>, E> {
        if let Some(slot) = self.entries.lock().get(&key) {
            self.stats.record_hits(1);
            return Ok(slot.clone().into());
        }
        self.stats.record_misses(1);

        let start = Instant::now();
        let loaded = match fetcher(&key) {
            Ok(Some(value)) => Ok(Some(Slot::Value(value))),
            Ok(None) => exists(&key).map(|found| found.then_some(Slot::Null)),
            Err(err) => Err(err),
        };
        let elapsed = start.elapsed();

        match loaded {
            Ok(Some(slot)) => {
                self.stats.record_load_success(elapsed);
                self.insert(key, slot.clone());
                Ok(slot.into())
            }
            Ok(None) => {
                self.stats.record_load_failure(elapsed);
                trace!(elapsed_us = elapsed.as_micros() as u64, "fetch found no mapping");
                Ok(Fetched::Absent)
            }
            Err(err) => {
                self.stats.record_load_failure(elapsed);
                Err(err)
            }
        }
    }

    /// The cached entry for `key`, or `None` if it is not cached. Records a
    /// hit or a miss but never loads.
    pub fn get_if_present<Q>(&self, key: &Q) -> Option<Fetched<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.entries.lock().get(key).cloned();
        match found {
            Some(slot) => {
                self.stats.record_hits(1);
                Some(slot.into())
            }
            None => {
                self.stats.record_misses(1);
                None
            }
        }
    }

    /// Overwrite the cached value for `key` only if the key is cached.
    /// Returns whether an entry was updated. Recency is left untouched.
    pub fn update<Q>(&self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.lock().peek_mut(key) {
            Some(slot) => {
                *slot = Slot::Value(value);
                true
            }
            None => false,
        }
    }

    /// Cache `value` for `key` unconditionally.
    pub fn put(&self, key: K, value: V) {
        self.insert(key, Slot::Value(value));
    }

    /// Cache a null marker for `key`.
    pub fn put_null(&self, key: K) {
        self.insert(key, Slot::Null);
    }

    /// Drop `key` from the cache. Returns whether it was cached.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().pop(key).is_some()
    }

    /// `true` if `key` is cached. Does not touch recency or statistics.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().contains(key)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    fn insert(&self, key: K, slot: Slot<V>) {
        let mut entries = self.entries.lock();
        let replacing = entries.contains(&key);
        if entries.push(key, slot).is_some() && !replacing {
            self.stats.record_eviction();
            trace!(capacity = entries.cap().get(), "evicted least recently used entry");
        }
    }
}

impl<K: Hash + Eq, V> fmt::Debug for StatsCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("StatsCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
