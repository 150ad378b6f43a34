//! Thread-safe decorators: one that serializes everything under a lock and
//! one that rejects every mutator.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Entry, Graph};

/// Shares one graph between threads. Clones refer to the same graph.
///
/// Each [`Graph`] call takes the lock for its duration. To iterate or run a
/// compound operation atomically, hold [`SyncGraph::lock`] and use views on
/// the guard.
pub struct SyncGraph<G> {
    inner: Arc<Mutex<G>>,
}

impl<G> SyncGraph<G> {
    pub fn new(graph: G) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Exclusive access for the lifetime of the guard.
    pub fn lock(&self) -> MutexGuard<'_, G> {
        self.inner.lock()
    }

    /// Run `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<G> Clone for SyncGraph<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, G: Graph<K, V>> Graph<K, V> for SyncGraph<G> {
    fn contains_path(&self, path: &[K]) -> bool {
        self.inner.lock().contains_path(path)
    }

    fn contains_value(&self, value: &V) -> bool {
        self.inner.lock().contains_value(value)
    }

    fn get(&self, path: &[K]) -> Option<V> {
        self.inner.lock().get(path)
    }

    fn get_all(&self, path: &[K]) -> Vec<V> {
        self.inner.lock().get_all(path)
    }

    fn put(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.inner.lock().put(path, value)
    }

    fn put_if_absent(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.inner.lock().put_if_absent(path, value)
    }

    fn put_all(&mut self, entries: Vec<Entry<K, V>>) -> GraphResult<()> {
        self.inner.lock().put_all(entries)
    }

    fn remove(&mut self, path: &[K]) -> GraphResult<Option<V>> {
        self.inner.lock().remove(path)
    }

    fn remove_paths(&mut self, paths: &[Vec<K>]) -> GraphResult<usize> {
        self.inner.lock().remove_paths(paths)
    }

    fn replace(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.inner.lock().replace(path, value)
    }

    fn replace_if(&mut self, path: &[K], old: &V, new: V) -> GraphResult<bool> {
        self.inner.lock().replace_if(path, old, new)
    }

    fn entries(&self) -> Vec<Entry<K, V>> {
        self.inner.lock().entries()
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn clear(&mut self) -> GraphResult<()> {
        self.inner.lock().clear()
    }
}

/// Passes reads through and fails every mutator with
/// [`GraphError::ReadOnly`].
pub struct ReadOnlyGraph<K, V, G> {
    inner: G,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, G: Graph<K, V>> ReadOnlyGraph<K, V, G> {
    pub fn new(graph: G) -> Self {
        Self {
            inner: graph,
            _marker: PhantomData,
        }
    }

    pub fn get_ref(&self) -> &G {
        &self.inner
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

impl<K, V, G: Graph<K, V>> Graph<K, V> for ReadOnlyGraph<K, V, G> {
    fn contains_path(&self, path: &[K]) -> bool {
        self.inner.contains_path(path)
    }

    fn contains_value(&self, value: &V) -> bool {
        self.inner.contains_value(value)
    }

    fn get(&self, path: &[K]) -> Option<V> {
        self.inner.get(path)
    }

    fn get_all(&self, path: &[K]) -> Vec<V> {
        self.inner.get_all(path)
    }

    fn put(&mut self, _path: &[K], _value: V) -> GraphResult<Option<V>> {
        Err(GraphError::ReadOnly)
    }

    fn put_if_absent(&mut self, _path: &[K], _value: V) -> GraphResult<Option<V>> {
        Err(GraphError::ReadOnly)
    }

    fn put_all(&mut self, _entries: Vec<Entry<K, V>>) -> GraphResult<()> {
        Err(GraphError::ReadOnly)
    }

    fn remove(&mut self, _path: &[K]) -> GraphResult<Option<V>> {
        Err(GraphError::ReadOnly)
    }

    fn remove_paths(&mut self, _paths: &[Vec<K>]) -> GraphResult<usize> {
        Err(GraphError::ReadOnly)
    }

    fn replace(&mut self, _path: &[K], _value: V) -> GraphResult<Option<V>> {
        Err(GraphError::ReadOnly)
    }

    fn replace_if(&mut self, _path: &[K], _old: &V, _new: V) -> GraphResult<bool> {
        Err(GraphError::ReadOnly)
    }

    fn entries(&self) -> Vec<Entry<K, V>> {
        self.inner.entries()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn clear(&mut self) -> GraphResult<()> {
        Err(GraphError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::tree::TrieTree;
    use crate::views::GraphViews;

    #[test]
    fn sync_graph_shares_state_across_clones() {
        let mut a = SyncGraph::new(TrieTree::<u32, u32>::new());
        let b = a.clone();
        a.put(&[1, 2], 3).unwrap();
        assert_eq!(b.get(&[1, 2]), Some(3));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn sync_graph_concurrent_writers() {
        let graph = SyncGraph::new(TrieTree::<u32, u32>::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let mut g = graph.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        g.put(&[t, i], i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(graph.len(), 400);
    }

    #[test]
    fn iteration_under_lock() {
        let graph = SyncGraph::new(TrieTree::<u32, u32>::new());
        graph.with(|g| {
            g.put(&[1], 1).unwrap();
            g.put(&[2], 2).unwrap();
        });
        let mut guard = graph.lock();
        let mut paths = guard.path_set();
        let mut cursor = paths.iter();
        while cursor.next().is_some() {
            cursor.remove().unwrap();
        }
        drop(guard);
        assert!(graph.is_empty());
    }

    #[test]
    fn read_only_rejects_mutators() {
        let mut tree = TrieTree::<u32, u32>::new();
        tree.put(&[1], 10).unwrap();
        let mut ro = ReadOnlyGraph::new(tree);

        assert_eq!(ro.get(&[1]), Some(10));
        assert!(ro.contains_path(&[1]));
        assert_eq!(ro.len(), 1);
        assert_eq!(ro.put(&[2], 1), Err(GraphError::ReadOnly));
        assert_eq!(ro.remove(&[1]), Err(GraphError::ReadOnly));
        assert_eq!(ro.clear(), Err(GraphError::ReadOnly));
        assert_eq!(ro.path_set().remove(&[1]), Err(GraphError::ReadOnly));
        assert_eq!(ro.get_ref().len(), 1);
    }

    #[test]
    fn read_only_over_shared_graph() {
        let mut shared = SyncGraph::new(TrieTree::<u32, u32>::new());
        let ro = ReadOnlyGraph::new(shared.clone());
        shared.put(&[5], 5).unwrap();
        assert_eq!(ro.get(&[5]), Some(5));
    }
}
