use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use arbor_graph::{Graph, TreeOptions, TrieTree};
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{
    validate_name, Backend, MapHandle, SnapshotEntry, StoreKey, StoreValue, TableKind,
    TableSnapshot, TableStorage, TreeHandle,
};
use crate::error::{StoreError, StoreResult};
use crate::translator::Translator;

/// Encodes an open handle into a snapshot on persist.
trait Flush: Send {
    fn snapshot(&self) -> StoreResult<TableSnapshot>;
}

struct TreeFlusher<K, V> {
    handle: TreeHandle<K, V>,
    keys: Arc<dyn Translator<K>>,
    values: Arc<dyn Translator<V>>,
}

impl<K: StoreKey, V: StoreValue> Flush for TreeFlusher<K, V> {
    fn snapshot(&self) -> StoreResult<TableSnapshot> {
        let entries = self.handle.lock().entries();
        let entries = entries
            .iter()
            .map(|entry| {
                Ok(SnapshotEntry {
                    path: entry
                        .path
                        .iter()
                        .map(|key| self.keys.encode(key))
                        .collect::<StoreResult<_>>()?,
                    value: self.values.encode(&entry.value)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(TableSnapshot { entries })
    }
}

struct MapFlusher<K, V> {
    handle: MapHandle<K, V>,
    keys: Arc<dyn Translator<K>>,
    values: Arc<dyn Translator<V>>,
}

impl<K: StoreKey, V: StoreValue> Flush for MapFlusher<K, V> {
    fn snapshot(&self) -> StoreResult<TableSnapshot> {
        let entries = self.handle.lock().entries();
        let entries = entries
            .iter()
            .map(|(key, value)| {
                Ok(SnapshotEntry {
                    path: vec![self.keys.encode(key)?],
                    value: self.values.encode(value)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(TableSnapshot { entries })
    }
}

#[derive(Default)]
struct OpenTables {
    trees: BTreeMap<String, Box<dyn Flush>>,
    maps: BTreeMap<String, Box<dyn Flush>>,
}

impl OpenTables {
    fn of_kind(&mut self, kind: TableKind) -> &mut BTreeMap<String, Box<dyn Flush>> {
        match kind {
            TableKind::Tree => &mut self.trees,
            TableKind::Map => &mut self.maps,
        }
    }
}

/// A backend that keeps materialized trees and maps in memory and saves
/// them as whole snapshots through a [`TableStorage`].
///
/// Materializing decodes the stored snapshot, if any, into a fresh
/// [`TrieTree`] or `HashMap`. Persisting re-encodes every open handle with
/// the translators it was materialized with.
pub struct SnapshotBackend<T> {
    tables: T,
    open: Mutex<OpenTables>,
}

impl<T: TableStorage> SnapshotBackend<T> {
    pub fn new(tables: T) -> Self {
        Self {
            tables,
            open: Mutex::new(OpenTables::default()),
        }
    }

    /// The underlying table storage.
    pub fn tables(&self) -> &T {
        &self.tables
    }

    fn decode_entries<K: StoreKey, V: StoreValue>(
        &self,
        kind: TableKind,
        name: &str,
        keys: &dyn Translator<K>,
        values: &dyn Translator<V>,
    ) -> StoreResult<Vec<(Vec<K>, V)>> {
        let Some(snapshot) = self.tables.load_table(kind, name)? else {
            return Ok(Vec::new());
        };
        snapshot
            .entries
            .iter()
            .map(|entry| {
                let path = entry
                    .path
                    .iter()
                    .map(|key| keys.decode(key))
                    .collect::<StoreResult<Vec<K>>>()?;
                Ok((path, values.decode(&entry.value)?))
            })
            .collect()
    }

    fn names(&self, kind: TableKind) -> StoreResult<Vec<String>> {
        let mut names: BTreeSet<String> = self.tables.table_names(kind)?.into_iter().collect();
        names.extend(self.open.lock().of_kind(kind).keys().cloned());
        Ok(names.into_iter().collect())
    }

    fn delete(&self, kind: TableKind, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        let was_open = self.open.lock().of_kind(kind).remove(name).is_some();
        let was_stored = self
            .tables
            .delete_table(kind, name)
            .map_err(|e| StoreError::delete(name, e))?;
        debug!(table = name, ?kind, was_open, was_stored, "deleted table");
        Ok(was_open || was_stored)
    }
}

impl<T: TableStorage> Backend for SnapshotBackend<T> {
    fn load(&self) -> StoreResult<()> {
        self.tables.prepare()
    }

    fn materialize_tree<K: StoreKey, V: StoreValue>(
        &self,
        name: &str,
        keys: Arc<dyn Translator<K>>,
        values: Arc<dyn Translator<V>>,
        options: TreeOptions<V>,
    ) -> StoreResult<TreeHandle<K, V>> {
        validate_name(name)?;
        let entries = self
            .decode_entries(TableKind::Tree, name, keys.as_ref(), values.as_ref())
            .map_err(|e| StoreError::materialize(name, e))?;

        let mut tree: TrieTree<K, V> = TrieTree::with_options(options);
        for (path, value) in entries {
            tree.put(&path, value)
                .map_err(|e| StoreError::materialize(name, e))?;
        }
        debug!(table = name, mappings = tree.len(), "materialized tree");

        let handle: TreeHandle<K, V> = Arc::new(Mutex::new(tree));
        self.open.lock().trees.insert(
            name.to_string(),
            Box::new(TreeFlusher {
                handle: Arc::clone(&handle),
                keys,
                values,
            }),
        );
        Ok(handle)
    }

    fn materialize_map<K: StoreKey, V: StoreValue>(
        &self,
        name: &str,
        keys: Arc<dyn Translator<K>>,
        values: Arc<dyn Translator<V>>,
    ) -> StoreResult<MapHandle<K, V>> {
        validate_name(name)?;
        let entries = self
            .decode_entries(TableKind::Map, name, keys.as_ref(), values.as_ref())
            .map_err(|e| StoreError::materialize(name, e))?;

        let mut map: HashMap<K, V> = HashMap::with_capacity(entries.len());
        for (mut path, value) in entries {
            if path.len() != 1 {
                return Err(StoreError::materialize(
                    name,
                    format!("map entry has a key path of length {}", path.len()),
                ));
            }
            if let Some(key) = path.pop() {
                map.insert(key, value);
            }
        }
        debug!(table = name, mappings = map.len(), "materialized map");

        let handle: MapHandle<K, V> = Arc::new(Mutex::new(map));
        self.open.lock().maps.insert(
            name.to_string(),
            Box::new(MapFlusher {
                handle: Arc::clone(&handle),
                keys,
                values,
            }),
        );
        Ok(handle)
    }

    fn delete_tree(&self, name: &str) -> StoreResult<bool> {
        self.delete(TableKind::Tree, name)
    }

    fn delete_map(&self, name: &str) -> StoreResult<bool> {
        self.delete(TableKind::Map, name)
    }

    fn tree_names(&self) -> StoreResult<Vec<String>> {
        self.names(TableKind::Tree)
    }

    fn map_names(&self) -> StoreResult<Vec<String>> {
        self.names(TableKind::Map)
    }

    fn persist(&self) -> StoreResult<()> {
        let open = self.open.lock();
        for (kind, tables) in [(TableKind::Tree, &open.trees), (TableKind::Map, &open.maps)] {
            for (name, flusher) in tables {
                let snapshot = flusher
                    .snapshot()
                    .map_err(|e| StoreError::persist(format!("{name}: {e}")))?;
                self.tables
                    .save_table(kind, name, &snapshot)
                    .map_err(|e| StoreError::persist(format!("{name}: {e}")))?;
            }
        }
        debug!(
            trees = open.trees.len(),
            maps = open.maps.len(),
            "persisted open tables"
        );
        Ok(())
    }
}
