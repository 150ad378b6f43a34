//! Flat-map engine: the whole path is the lookup key.
//!
//! There are no intermediate nodes, so nothing needs pruning. Use it when
//! prefix sharing buys nothing, e.g. short fixed-depth paths.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use crate::error::{GraphError, GraphResult};
use crate::graph::{graph_eq, graph_hash, Entry, Graph};
use crate::options::TreeOptions;

pub struct FlatTree<K, V> {
    map: HashMap<Vec<K>, V>,
    options: TreeOptions<V>,
}

impl<K, V> FlatTree<K, V> {
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions<V>) -> Self {
        Self {
            map: HashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &TreeOptions<V> {
        &self.options
    }

    fn check_path(&self, path: &[K]) -> GraphResult<()> {
        if path.is_empty() && !self.options.allow_root_value {
            return Err(GraphError::EmptyPath);
        }
        Ok(())
    }
}

impl<K, V> Default for FlatTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> FlatTree<K, V> {
    pub fn get_ref(&self, path: &[K]) -> Option<&V> {
        self.map.get(path)
    }
}

impl<K, V> Graph<K, V> for FlatTree<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
{
    fn contains_path(&self, path: &[K]) -> bool {
        self.map.contains_key(path)
    }

    fn contains_value(&self, value: &V) -> bool {
        self.map.values().any(|v| v == value)
    }

    fn get(&self, path: &[K]) -> Option<V> {
        self.map.get(path).cloned()
    }

    fn get_all(&self, path: &[K]) -> Vec<V> {
        (1..=path.len())
            .filter_map(|end| self.map.get(&path[..end]).cloned())
            .collect()
    }

    fn put(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.check_path(path)?;
        Ok(self.map.insert(path.to_vec(), value))
    }

    fn put_if_absent(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.check_path(path)?;
        if let Some(current) = self.map.get(path) {
            if !self.options.null_policy.treats_as_absent(current) {
                return Ok(Some(current.clone()));
            }
        }
        self.map.insert(path.to_vec(), value);
        Ok(None)
    }

    fn remove(&mut self, path: &[K]) -> GraphResult<Option<V>> {
        Ok(self.map.remove(path))
    }

    fn replace(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        let policy = self.options.null_policy;
        match self.map.get_mut(path) {
            Some(slot) if !policy.treats_as_absent(slot) => Ok(Some(mem::replace(slot, value))),
            _ => Ok(None),
        }
    }

    fn replace_if(&mut self, path: &[K], old: &V, new: V) -> GraphResult<bool> {
        match self.map.get_mut(path) {
            Some(slot) if *slot == *old => {
                *slot = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn entries(&self) -> Vec<Entry<K, V>> {
        self.map
            .iter()
            .map(|(path, value)| Entry::new(path.clone(), value.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) -> GraphResult<()> {
        self.map.clear();
        Ok(())
    }
}

impl<K, V, G> PartialEq<G> for FlatTree<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
    G: Graph<K, V>,
{
    fn eq(&self, other: &G) -> bool {
        graph_eq(self, other)
    }
}

impl<K: Clone + Hash + Eq, V: Clone + Eq> Eq for FlatTree<K, V> {}

impl<K, V> Hash for FlatTree<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq + Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(graph_hash(self));
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for FlatTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}
