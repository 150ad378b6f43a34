//! Cache-backed adapters over materialized trees and maps.
//!
//! Reads go through the adapter's [`StatsCache`] first and fall through to
//! the backend handle on a miss. Writes keep the cache coherent:
//!
//! - `put` / `put_all` / `insert` update an already-cached entry *before*
//!   delegating, so the new value is visible immediately.
//! - single-key removals and conditional writes invalidate that key.
//! - bulk removals (`clear`, `remove_paths`, view bulk removal) drop the
//!   whole cache.
//! - a write the backing store rejects drops the keys it touched.
//!
//! Adapters created by [`Storage`](crate::Storage) share its open flag.
//! Once the storage is closed every mutator fails and reads see nothing.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arbor_cache::{CacheStats, StatsCache};
use arbor_graph::{Entry, Graph, GraphError, GraphResult};

use crate::backend::{MapHandle, StoreKey, StoreValue, TreeHandle};
use crate::error::{StoreError, StoreResult};
use crate::map::KeyValueMap;

struct TreeShared<K, V> {
    name: String,
    graph: TreeHandle<K, V>,
    cache: StatsCache<Vec<K>, V>,
    open: Arc<AtomicBool>,
}

impl<K, V> TreeShared<K, V> {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> GraphResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(GraphError::IllegalState(format!(
                "tree '{}' belongs to a closed storage",
                self.name
            )))
        }
    }
}

/// A named tree served through a cache.
///
/// Clones share the same tree and cache; [`ptr_eq`](CachedTree::ptr_eq)
/// tells whether two handles are the same logical instance.
///
/// The cache lock is not held while a miss reads the tree. A clone used
/// from another thread can therefore cache a value read just before a
/// concurrent `put` and keep serving it until that path is written or
/// invalidated again.
pub struct CachedTree<K, V> {
    inner: Arc<TreeShared<K, V>>,
}

impl<K: StoreKey, V: StoreValue> CachedTree<K, V> {
    /// A standalone adapter that is always open.
    pub fn new(name: impl Into<String>, graph: TreeHandle<K, V>, cache_size: NonZeroUsize) -> Self {
        Self::attached(name, graph, cache_size, Arc::new(AtomicBool::new(true)))
    }

    /// An adapter that stops serving once `open` is cleared.
    pub(crate) fn attached(
        name: impl Into<String>,
        graph: TreeHandle<K, V>,
        cache_size: NonZeroUsize,
        open: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner: Arc::new(TreeShared {
                name: name.into(),
                graph,
                cache: StatsCache::new(cache_size),
                open,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `false` once the owning storage has been closed.
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Number of cached paths.
    pub fn cached_len(&self) -> usize {
        self.inner.cache.len()
    }
}

impl<K, V> Clone for CachedTree<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for CachedTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedTree")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl<K: StoreKey, V: StoreValue> Graph<K, V> for CachedTree<K, V> {
    fn contains_path(&self, path: &[K]) -> bool {
        self.inner.is_open()
            && (self.inner.cache.contains(path) || self.inner.graph.lock().contains_path(path))
    }

    fn contains_value(&self, value: &V) -> bool {
        self.inner.is_open() && self.inner.graph.lock().contains_value(value)
    }

    fn get(&self, path: &[K]) -> Option<V> {
        if !self.inner.is_open() {
            return None;
        }
        let graph = &self.inner.graph;
        self.inner
            .cache
            .fetch(
                path.to_vec(),
                |p| graph.lock().get(p),
                |p| graph.lock().contains_path(p),
            )
            .into_value()
    }

    fn get_all(&self, path: &[K]) -> Vec<V> {
        if !self.inner.is_open() {
            return Vec::new();
        }
        self.inner.graph.lock().get_all(path)
    }

    fn put(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.inner.ensure_open()?;
        self.inner.cache.update(path, value.clone());
        let result = self.inner.graph.lock().put(path, value);
        if result.is_err() {
            self.inner.cache.remove(path);
        }
        result
    }

    fn put_if_absent(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.inner.ensure_open()?;
        let result = self.inner.graph.lock().put_if_absent(path, value);
        self.inner.cache.remove(path);
        result
    }

    fn put_all(&mut self, entries: Vec<Entry<K, V>>) -> GraphResult<()> {
        self.inner.ensure_open()?;
        let touched: Vec<Vec<K>> = entries.iter().map(|e| e.path().to_vec()).collect();
        for entry in &entries {
            self.inner.cache.update(entry.path(), entry.value().clone());
        }
        let result = self.inner.graph.lock().put_all(entries);
        if result.is_err() {
            for path in &touched {
                self.inner.cache.remove(path);
            }
        }
        result
    }

    fn remove(&mut self, path: &[K]) -> GraphResult<Option<V>> {
        self.inner.ensure_open()?;
        let result = self.inner.graph.lock().remove(path);
        self.inner.cache.remove(path);
        result
    }

    fn remove_paths(&mut self, paths: &[Vec<K>]) -> GraphResult<usize> {
        self.inner.ensure_open()?;
        let result = self.inner.graph.lock().remove_paths(paths);
        self.inner.cache.clear();
        result
    }

    fn replace(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.inner.ensure_open()?;
        let result = self.inner.graph.lock().replace(path, value);
        self.inner.cache.remove(path);
        result
    }

    fn replace_if(&mut self, path: &[K], old: &V, new: V) -> GraphResult<bool> {
        self.inner.ensure_open()?;
        let result = self.inner.graph.lock().replace_if(path, old, new);
        self.inner.cache.remove(path);
        result
    }

    fn entries(&self) -> Vec<Entry<K, V>> {
        if !self.inner.is_open() {
            return Vec::new();
        }
        self.inner.graph.lock().entries()
    }

    fn len(&self) -> usize {
        if !self.inner.is_open() {
            return 0;
        }
        self.inner.graph.lock().len()
    }

    fn clear(&mut self) -> GraphResult<()> {
        self.inner.ensure_open()?;
        let result = self.inner.graph.lock().clear();
        self.inner.cache.clear();
        result
    }
}

struct MapShared<K, V> {
    name: String,
    map: MapHandle<K, V>,
    cache: StatsCache<K, V>,
    open: Arc<AtomicBool>,
}

impl<K, V> MapShared<K, V> {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }
}

/// A named map served through a cache. Clones share the same map and cache,
/// with the same stale-read caveat as [`CachedTree`].
pub struct CachedMap<K, V> {
    inner: Arc<MapShared<K, V>>,
}

impl<K: StoreKey, V: StoreValue> CachedMap<K, V> {
    pub fn new(name: impl Into<String>, map: MapHandle<K, V>, cache_size: NonZeroUsize) -> Self {
        Self::attached(name, map, cache_size, Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn attached(
        name: impl Into<String>,
        map: MapHandle<K, V>,
        cache_size: NonZeroUsize,
        open: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner: Arc::new(MapShared {
                name: name.into(),
                map,
                cache: StatsCache::new(cache_size),
                open,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn cached_len(&self) -> usize {
        self.inner.cache.len()
    }
}

impl<K, V> Clone for CachedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for CachedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedMap")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl<K: StoreKey, V: StoreValue> KeyValueMap<K, V> for CachedMap<K, V> {
    fn contains_key(&self, key: &K) -> bool {
        self.inner.is_open()
            && (self.inner.cache.contains(key) || self.inner.map.lock().contains_key(key))
    }

    fn get(&self, key: &K) -> Option<V> {
        if !self.inner.is_open() {
            return None;
        }
        let map = &self.inner.map;
        self.inner
            .cache
            .fetch(
                key.clone(),
                |k| map.lock().get(k),
                |k| map.lock().contains_key(k),
            )
            .into_value()
    }

    fn insert(&mut self, key: K, value: V) -> StoreResult<Option<V>> {
        self.inner.ensure_open()?;
        self.inner.cache.update(&key, value.clone());
        let result = self.inner.map.lock().insert(key.clone(), value);
        if result.is_err() {
            self.inner.cache.remove(&key);
        }
        result
    }

    fn insert_all(&mut self, entries: Vec<(K, V)>) -> StoreResult<()> {
        self.inner.ensure_open()?;
        let touched: Vec<K> = entries.iter().map(|(key, _)| key.clone()).collect();
        for (key, value) in &entries {
            self.inner.cache.update(key, value.clone());
        }
        let result = self.inner.map.lock().insert_all(entries);
        if result.is_err() {
            for key in &touched {
                self.inner.cache.remove(key);
            }
        }
        result
    }

    fn remove(&mut self, key: &K) -> StoreResult<Option<V>> {
        self.inner.ensure_open()?;
        let result = self.inner.map.lock().remove(key);
        self.inner.cache.remove(key);
        result
    }

    fn entries(&self) -> Vec<(K, V)> {
        if !self.inner.is_open() {
            return Vec::new();
        }
        self.inner.map.lock().entries()
    }

    fn len(&self) -> usize {
        if !self.inner.is_open() {
            return 0;
        }
        self.inner.map.lock().len()
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.inner.ensure_open()?;
        let result = self.inner.map.lock().clear();
        self.inner.cache.clear();
        result
    }
}
