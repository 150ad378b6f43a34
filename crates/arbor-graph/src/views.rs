//! Collection views over a graph: paths, values, and entries.
//!
//! Views borrow the graph mutably. Size and membership queries go straight
//! to the graph. Iteration runs over a depth-first snapshot taken when the
//! cursor is created; changing the graph through anything other than the
//! cursor while it is alive gives unspecified (but memory-safe) results.
//! There is no `add`: views only read and delete.

use std::marker::PhantomData;
use std::vec;

use crate::error::{GraphError, GraphResult};
use crate::graph::{Entry, Graph};

/// Chooses what a [`Cursor`] yields for each snapshot entry.
pub trait Projection<K, V> {
    type Item;

    fn project(entry: &Entry<K, V>) -> Self::Item;
}

/// Yields paths.
#[derive(Debug)]
pub struct PathItems;

/// Yields values.
#[derive(Debug)]
pub struct ValueItems;

/// Yields whole entries.
#[derive(Debug)]
pub struct EntryItems;

impl<K: Clone, V> Projection<K, V> for PathItems {
    type Item = Vec<K>;

    fn project(entry: &Entry<K, V>) -> Vec<K> {
        entry.path.clone()
    }
}

impl<K, V: Clone> Projection<K, V> for ValueItems {
    type Item = V;

    fn project(entry: &Entry<K, V>) -> V {
        entry.value.clone()
    }
}

impl<K: Clone, V: Clone> Projection<K, V> for EntryItems {
    type Item = Entry<K, V>;

    fn project(entry: &Entry<K, V>) -> Entry<K, V> {
        entry.clone()
    }
}

/// Snapshot iterator that can delete the element it last yielded.
pub struct Cursor<'g, K, V, G: ?Sized, P> {
    graph: &'g mut G,
    snapshot: vec::IntoIter<Entry<K, V>>,
    current: Option<Vec<K>>,
    _projection: PhantomData<P>,
}

impl<'g, K, V, G, P> Cursor<'g, K, V, G, P>
where
    G: Graph<K, V> + ?Sized,
{
    fn new(graph: &'g mut G) -> Self {
        let snapshot = graph.entries().into_iter();
        Self {
            graph,
            snapshot,
            current: None,
            _projection: PhantomData,
        }
    }

    /// Remove the mapping for the element last returned by `next`.
    ///
    /// Fails if nothing has been yielded yet or the element was already
    /// removed through this cursor.
    pub fn remove(&mut self) -> GraphResult<Option<V>> {
        let path = self.current.take().ok_or_else(|| {
            GraphError::IllegalState("cursor has no current element to remove".to_string())
        })?;
        self.graph.remove(&path)
    }

    /// Elements left in the snapshot.
    pub fn remaining(&self) -> usize {
        self.snapshot.len()
    }
}

impl<'g, K, V, G> Cursor<'g, K, V, G, EntryItems>
where
    G: Graph<K, V> + ?Sized,
{
    /// Write `value` through to the mapping of the current entry.
    pub fn set_value(&mut self, value: V) -> GraphResult<Option<V>> {
        let path = self.current.as_ref().ok_or_else(|| {
            GraphError::IllegalState("cursor has no current entry".to_string())
        })?;
        if !self.graph.contains_path(path) {
            return Err(GraphError::IllegalState(
                "current entry is no longer mapped".to_string(),
            ));
        }
        self.graph.put(path, value)
    }
}

impl<'g, K, V, G, P> Iterator for Cursor<'g, K, V, G, P>
where
    G: Graph<K, V> + ?Sized,
    P: Projection<K, V>,
{
    type Item = P::Item;

    fn next(&mut self) -> Option<P::Item> {
        let entry = self.snapshot.next()?;
        let item = P::project(&entry);
        self.current = Some(entry.path);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.snapshot.size_hint()
    }
}

pub type PathCursor<'g, K, V, G> = Cursor<'g, K, V, G, PathItems>;
pub type ValueCursor<'g, K, V, G> = Cursor<'g, K, V, G, ValueItems>;
pub type EntryCursor<'g, K, V, G> = Cursor<'g, K, V, G, EntryItems>;

// ---------------------------------------------------------------------------
// Path set
// ---------------------------------------------------------------------------

/// Set view of every mapped path.
pub struct PathSet<'g, K, V, G: ?Sized> {
    graph: &'g mut G,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<'g, K, V, G> PathSet<'g, K, V, G>
where
    G: Graph<K, V> + ?Sized,
{
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn contains(&self, path: &[K]) -> bool {
        self.graph.contains_path(path)
    }

    /// Remove the mapping at `path`. Returns `true` if one existed.
    pub fn remove(&mut self, path: &[K]) -> GraphResult<bool> {
        Ok(self.graph.remove(path)?.is_some())
    }

    /// Returns `true` if any listed path was mapped.
    pub fn remove_all(&mut self, paths: &[Vec<K>]) -> GraphResult<bool> {
        Ok(self.graph.remove_paths(paths)? > 0)
    }

    /// Keep only paths for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&[K]) -> bool) -> GraphResult<bool> {
        let doomed: Vec<Vec<K>> = self
            .graph
            .entries()
            .into_iter()
            .filter(|entry| !keep(entry.path.as_slice()))
            .map(|entry| entry.path)
            .collect();
        self.remove_all(&doomed)
    }

    pub fn retain_all(&mut self, paths: &[Vec<K>]) -> GraphResult<bool>
    where
        K: PartialEq,
    {
        self.retain(|path| paths.iter().any(|kept| kept.as_slice() == path))
    }

    pub fn clear(&mut self) -> GraphResult<()> {
        self.graph.clear()
    }

    pub fn iter(&mut self) -> PathCursor<'_, K, V, G> {
        Cursor::new(&mut *self.graph)
    }

    pub fn to_vec(&self) -> Vec<Vec<K>> {
        self.graph.entries().into_iter().map(|e| e.path).collect()
    }
}

// ---------------------------------------------------------------------------
// Value collection
// ---------------------------------------------------------------------------

/// Collection view of every mapped value, in traversal order.
pub struct Values<'g, K, V, G: ?Sized> {
    graph: &'g mut G,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<'g, K, V, G> Values<'g, K, V, G>
where
    V: PartialEq,
    G: Graph<K, V> + ?Sized,
{
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn contains(&self, value: &V) -> bool {
        self.graph.contains_value(value)
    }

    /// Remove the first mapping (in traversal order) holding `value`.
    pub fn remove(&mut self, value: &V) -> GraphResult<bool> {
        let found = self
            .graph
            .entries()
            .into_iter()
            .find(|entry| entry.value == *value);
        match found {
            Some(entry) => Ok(self.graph.remove(&entry.path)?.is_some()),
            None => Ok(false),
        }
    }

    /// Remove every mapping whose value is listed.
    pub fn remove_all(&mut self, values: &[V]) -> GraphResult<bool> {
        self.retain(|value| !values.contains(value))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&V) -> bool) -> GraphResult<bool> {
        let doomed: Vec<Vec<K>> = self
            .graph
            .entries()
            .into_iter()
            .filter(|entry| !keep(&entry.value))
            .map(|entry| entry.path)
            .collect();
        Ok(self.graph.remove_paths(&doomed)? > 0)
    }

    pub fn retain_all(&mut self, values: &[V]) -> GraphResult<bool> {
        self.retain(|value| values.contains(value))
    }

    pub fn clear(&mut self) -> GraphResult<()> {
        self.graph.clear()
    }

    pub fn iter(&mut self) -> ValueCursor<'_, K, V, G> {
        Cursor::new(&mut *self.graph)
    }

    pub fn to_vec(&self) -> Vec<V> {
        self.graph.entries().into_iter().map(|e| e.value).collect()
    }
}

// ---------------------------------------------------------------------------
// Entry set
// ---------------------------------------------------------------------------

/// Set view of every (path, value) mapping.
pub struct EntrySet<'g, K, V, G: ?Sized> {
    graph: &'g mut G,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<'g, K, V, G> EntrySet<'g, K, V, G>
where
    V: PartialEq,
    G: Graph<K, V> + ?Sized,
{
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn contains(&self, entry: &Entry<K, V>) -> bool {
        self.graph.get(&entry.path).as_ref() == Some(&entry.value)
    }

    /// Remove `entry` if the graph maps its path to its value.
    pub fn remove(&mut self, entry: &Entry<K, V>) -> GraphResult<bool> {
        if !self.contains(entry) {
            return Ok(false);
        }
        Ok(self.graph.remove(&entry.path)?.is_some())
    }

    pub fn remove_all(&mut self, entries: &[Entry<K, V>]) -> GraphResult<bool>
    where
        K: Clone,
    {
        let doomed: Vec<Vec<K>> = entries
            .iter()
            .filter(|entry| self.contains(entry))
            .map(|entry| entry.path.clone())
            .collect();
        Ok(self.graph.remove_paths(&doomed)? > 0)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Entry<K, V>) -> bool) -> GraphResult<bool> {
        let doomed: Vec<Vec<K>> = self
            .graph
            .entries()
            .into_iter()
            .filter(|entry| !keep(entry))
            .map(|entry| entry.path)
            .collect();
        Ok(self.graph.remove_paths(&doomed)? > 0)
    }

    pub fn clear(&mut self) -> GraphResult<()> {
        self.graph.clear()
    }

    pub fn iter(&mut self) -> EntryCursor<'_, K, V, G> {
        Cursor::new(&mut *self.graph)
    }

    pub fn to_vec(&self) -> Vec<Entry<K, V>> {
        self.graph.entries()
    }
}

/// View constructors, available on every [`Graph`] (including trait
/// objects).
pub trait GraphViews<K, V>: Graph<K, V> {
    fn path_set(&mut self) -> PathSet<'_, K, V, Self>;

    fn values(&mut self) -> Values<'_, K, V, Self>;

    fn entry_set(&mut self) -> EntrySet<'_, K, V, Self>;
}

impl<K, V, G: Graph<K, V> + ?Sized> GraphViews<K, V> for G {
    fn path_set(&mut self) -> PathSet<'_, K, V, Self> {
        PathSet {
            graph: self,
            _marker: PhantomData,
        }
    }

    fn values(&mut self) -> Values<'_, K, V, Self> {
        Values {
            graph: self,
            _marker: PhantomData,
        }
    }

    fn entry_set(&mut self) -> EntrySet<'_, K, V, Self> {
        EntrySet {
            graph: self,
            _marker: PhantomData,
        }
    }
}
