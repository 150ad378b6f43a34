//! Backends materialize named trees and maps and persist them.
//!
//! [`Backend`] is the contract the [`Storage`](crate::Storage) facade
//! consumes. [`SnapshotBackend`] implements it over any [`TableStorage`],
//! which only needs to load and save whole [`TableSnapshot`]s:
//!
//! - [`MemoryTables`] -- snapshots held in memory, for tests and embedding
//! - [`FileTables`] -- one checksummed file per table under a directory

pub mod file;
pub mod memory;
pub mod snapshot;

use std::hash::Hash;
use std::sync::Arc;

use arbor_graph::{Graph, TreeOptions};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::map::KeyValueMap;
use crate::translator::Translator;

pub use file::FileTables;
pub use memory::MemoryTables;
pub use snapshot::SnapshotBackend;

/// A materialized tree, shared between the backend (which persists it) and
/// the adapter (which serves it).
pub type TreeHandle<K, V> = Arc<Mutex<dyn Graph<K, V> + Send>>;

/// A materialized map.
pub type MapHandle<K, V> = Arc<Mutex<dyn KeyValueMap<K, V> + Send>>;

/// Bounds a tree or map key must satisfy to be stored.
pub trait StoreKey: Clone + Hash + Eq + Send + 'static {}

impl<T: Clone + Hash + Eq + Send + 'static> StoreKey for T {}

/// Bounds a tree or map value must satisfy to be stored.
pub trait StoreValue: Clone + PartialEq + Send + 'static {}

impl<T: Clone + PartialEq + Send + 'static> StoreValue for T {}

/// A persistence backend.
///
/// The facade calls `materialize_*` at most once per name while a handle is
/// open, and calls `persist` on an external save signal and on close.
/// Retry policy belongs to the caller; backends report failures once.
pub trait Backend: Send + Sync {
    /// Prepare the backend for use.
    fn load(&self) -> StoreResult<()>;

    /// Produce the named tree, populated from any stored snapshot.
    fn materialize_tree<K: StoreKey, V: StoreValue>(
        &self,
        name: &str,
        keys: Arc<dyn Translator<K>>,
        values: Arc<dyn Translator<V>>,
        options: TreeOptions<V>,
    ) -> StoreResult<TreeHandle<K, V>>;

    /// Produce the named map, populated from any stored snapshot.
    fn materialize_map<K: StoreKey, V: StoreValue>(
        &self,
        name: &str,
        keys: Arc<dyn Translator<K>>,
        values: Arc<dyn Translator<V>>,
    ) -> StoreResult<MapHandle<K, V>>;

    /// Delete the named tree, open or stored. Returns whether it existed.
    fn delete_tree(&self, name: &str) -> StoreResult<bool>;

    fn delete_map(&self, name: &str) -> StoreResult<bool>;

    /// Names of every tree the backend knows about, open or stored, sorted.
    fn tree_names(&self) -> StoreResult<Vec<String>>;

    fn map_names(&self) -> StoreResult<Vec<String>>;

    /// Save every open tree and map.
    fn persist(&self) -> StoreResult<()>;
}

/// Which namespace a table belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    Tree,
    Map,
}

impl TableKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            TableKind::Tree => "trees",
            TableKind::Map => "maps",
        }
    }
}

/// One encoded mapping. Map entries use a single-element path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub path: Vec<Value>,
    pub value: Value,
}

/// The full encoded contents of one tree or map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl TableSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whole-table storage underneath a [`SnapshotBackend`].
pub trait TableStorage: Send + Sync {
    /// Create whatever the storage needs before first use.
    fn prepare(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Returns `Ok(None)` if no table of that name is stored.
    fn load_table(&self, kind: TableKind, name: &str) -> StoreResult<Option<TableSnapshot>>;

    fn save_table(&self, kind: TableKind, name: &str, snapshot: &TableSnapshot) -> StoreResult<()>;

    /// Returns `true` if the table existed.
    fn delete_table(&self, kind: TableKind, name: &str) -> StoreResult<bool>;

    /// Stored table names, sorted.
    fn table_names(&self, kind: TableKind) -> StoreResult<Vec<String>>;
}

/// Reject names that cannot be stored as a single table.
pub fn validate_name(name: &str) -> StoreResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(['/', '\\', '\0']) {
        "name contains a path separator or NUL"
    } else if name == "." || name.contains("..") {
        "name contains a relative path component"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
