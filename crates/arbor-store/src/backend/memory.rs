use std::collections::HashMap;

use parking_lot::RwLock;

use crate::backend::{validate_name, TableKind, TableSnapshot, TableStorage};
use crate::error::StoreResult;

/// In-memory table storage.
///
/// Intended for tests and embedding. Snapshots are cloned on save and load,
/// so a stored table never aliases an open handle.
#[derive(Default)]
pub struct MemoryTables {
    tables: RwLock<HashMap<(TableKind, String), TableSnapshot>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tables across both kinds.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}

impl TableStorage for MemoryTables {
    fn load_table(&self, kind: TableKind, name: &str) -> StoreResult<Option<TableSnapshot>> {
        Ok(self.tables.read().get(&(kind, name.to_string())).cloned())
    }

    fn save_table(&self, kind: TableKind, name: &str, snapshot: &TableSnapshot) -> StoreResult<()> {
        validate_name(name)?;
        self.tables
            .write()
            .insert((kind, name.to_string()), snapshot.clone());
        Ok(())
    }

    fn delete_table(&self, kind: TableKind, name: &str) -> StoreResult<bool> {
        Ok(self.tables.write().remove(&(kind, name.to_string())).is_some())
    }

    fn table_names(&self, kind: TableKind) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
