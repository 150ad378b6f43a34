//! The map-like store contract backends hand out alongside trees.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::error::StoreResult;

/// A mutable key-value map.
///
/// `get` returns `None` only when there is no mapping; a value type that
/// can be null expresses null as a value (for example `Option<T>`).
///
/// Mutators are fallible so wrappers can refuse writes, for example once
/// their storage is closed. The plain collections never fail.
pub trait KeyValueMap<K, V> {
    fn contains_key(&self, key: &K) -> bool;

    fn get(&self, key: &K) -> Option<V>;

    /// Create or replace the mapping, returning the previous value.
    fn insert(&mut self, key: K, value: V) -> StoreResult<Option<V>>;

    /// Insert every pair in order, stopping at the first error.
    fn insert_all(&mut self, entries: Vec<(K, V)>) -> StoreResult<()> {
        for (key, value) in entries {
            self.insert(key, value)?;
        }
        Ok(())
    }

    fn remove(&mut self, key: &K) -> StoreResult<Option<V>>;

    /// Snapshot of every mapping, in the map's iteration order.
    fn entries(&self) -> Vec<(K, V)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) -> StoreResult<()>;
}

impl<K, V> KeyValueMap<K, V> for HashMap<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    fn contains_key(&self, key: &K) -> bool {
        HashMap::contains_key(self, key)
    }

    fn get(&self, key: &K) -> Option<V> {
        HashMap::get(self, key).cloned()
    }

    fn insert(&mut self, key: K, value: V) -> StoreResult<Option<V>> {
        Ok(HashMap::insert(self, key, value))
    }

    fn remove(&mut self, key: &K) -> StoreResult<Option<V>> {
        Ok(HashMap::remove(self, key))
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn clear(&mut self) -> StoreResult<()> {
        HashMap::clear(self);
        Ok(())
    }
}

impl<K, V> KeyValueMap<K, V> for BTreeMap<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    fn contains_key(&self, key: &K) -> bool {
        BTreeMap::contains_key(self, key)
    }

    fn get(&self, key: &K) -> Option<V> {
        BTreeMap::get(self, key).cloned()
    }

    fn insert(&mut self, key: K, value: V) -> StoreResult<Option<V>> {
        Ok(BTreeMap::insert(self, key, value))
    }

    fn remove(&mut self, key: &K) -> StoreResult<Option<V>> {
        Ok(BTreeMap::remove(self, key))
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn clear(&mut self) -> StoreResult<()> {
        BTreeMap::clear(self);
        Ok(())
    }
}
