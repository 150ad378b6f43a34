//! The path-keyed graph contract shared by every tree engine and decorator.
//!
//! A [`Graph`] maps paths (sequences of key elements) to values. The empty
//! path denotes the root. "No mapping" is always `None`; engines never use
//! `None` to mean anything else, so a store that needs null-valued mappings
//! picks a nullable value type and stores `Some(null)`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use crate::error::GraphResult;

/// A snapshot of one mapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry<K, V> {
    /// The full path of the mapping.
    pub path: Vec<K>,
    /// The mapped value.
    pub value: V,
}

impl<K, V> Entry<K, V> {
    pub fn new(path: Vec<K>, value: V) -> Self {
        Self { path, value }
    }

    pub fn path(&self) -> &[K] {
        &self.path
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_parts(self) -> (Vec<K>, V) {
        (self.path, self.value)
    }
}

impl<K: Hash, V: Hash> Entry<K, V> {
    /// Hash of this entry: the path hash XOR the value hash.
    pub fn entry_hash(&self) -> u64 {
        let state = BuildHasherDefault::<DefaultHasher>::default();
        state.hash_one(&self.path) ^ state.hash_one(&self.value)
    }
}

/// A mutable mapping from paths to values.
///
/// Mutators return [`GraphResult`] because decorators may reject them
/// (read-only wrappers) and engines reject a root mapping unless configured
/// to allow one.
pub trait Graph<K, V> {
    /// Returns `true` if a mapping exists for exactly `path`.
    fn contains_path(&self, path: &[K]) -> bool;

    /// Returns `true` if any mapping holds `value`.
    fn contains_value(&self, value: &V) -> bool;

    /// The value mapped at `path`, or `None` if there is no mapping.
    fn get(&self, path: &[K]) -> Option<V>;

    /// Values at every non-empty prefix of `path` that has a mapping, in
    /// root-to-leaf order. Unmapped prefixes are skipped.
    fn get_all(&self, path: &[K]) -> Vec<V>;

    /// Create or replace the mapping at `path`, returning the previous value.
    fn put(&mut self, path: &[K], value: V) -> GraphResult<Option<V>>;

    /// Insert only if no mapping exists. Returns the value that kept its
    /// place, or `None` if `value` was inserted.
    fn put_if_absent(&mut self, path: &[K], value: V) -> GraphResult<Option<V>>;

    /// Put every entry in order, stopping at the first failure.
    fn put_all(&mut self, entries: Vec<Entry<K, V>>) -> GraphResult<()> {
        for entry in entries {
            let (path, value) = entry.into_parts();
            self.put(&path, value)?;
        }
        Ok(())
    }

    /// Delete the mapping at `path`, returning the removed value.
    fn remove(&mut self, path: &[K]) -> GraphResult<Option<V>>;

    /// Delete every listed mapping. Returns how many mappings were removed.
    fn remove_paths(&mut self, paths: &[Vec<K>]) -> GraphResult<usize> {
        let mut removed = 0;
        for path in paths {
            if self.remove(path)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Replace the value at `path` only if a mapping already exists.
    fn replace(&mut self, path: &[K], value: V) -> GraphResult<Option<V>>;

    /// Replace the value at `path` only if it currently equals `old`.
    fn replace_if(&mut self, path: &[K], old: &V, new: V) -> GraphResult<bool>;

    /// Depth-first snapshot of every mapping.
    fn entries(&self) -> Vec<Entry<K, V>>;

    /// Number of mappings.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every mapping.
    fn clear(&mut self) -> GraphResult<()>;
}

/// Structural equality: both graphs hold the same set of (path, value)
/// mappings, regardless of how either one stores them.
pub fn graph_eq<K, V, A, B>(a: &A, b: &B) -> bool
where
    V: PartialEq,
    A: Graph<K, V> + ?Sized,
    B: Graph<K, V> + ?Sized,
{
    if a.len() != b.len() {
        return false;
    }
    a.entries()
        .iter()
        .all(|entry| b.get(&entry.path).as_ref() == Some(&entry.value))
}

/// Layout-independent hash: XOR of every entry's [`Entry::entry_hash`].
pub fn graph_hash<K, V, G>(graph: &G) -> u64
where
    K: Hash,
    V: Hash,
    G: Graph<K, V> + ?Sized,
{
    graph
        .entries()
        .iter()
        .fold(0, |acc, entry| acc ^ entry.entry_hash())
}
