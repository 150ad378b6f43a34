use std::any::{self, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arbor_graph::TreeOptions;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::adapter::{CachedMap, CachedTree};
use crate::backend::{
    validate_name, Backend, FileTables, MemoryTables, SnapshotBackend, StoreKey, StoreValue,
};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::translator::{Translator, TranslatorKind};

/// Lifecycle of a [`Storage`] facade. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageState {
    Unloaded,
    Loaded,
    Closed,
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageState::Unloaded => write!(f, "unloaded"),
            StorageState::Loaded => write!(f, "loaded"),
            StorageState::Closed => write!(f, "closed"),
        }
    }
}

/// One open tree or map and the translators it was opened with.
struct Registration {
    handle: Box<dyn Any + Send + Sync>,
    key_kind: TranslatorKind,
    value_kind: TranslatorKind,
}

impl Registration {
    fn check_kinds(
        &self,
        name: &str,
        key_kind: TranslatorKind,
        value_kind: TranslatorKind,
    ) -> StoreResult<()> {
        for (role, expected, found) in [
            ("key", self.key_kind, key_kind),
            ("value", self.value_kind, value_kind),
        ] {
            if expected != found {
                return Err(StoreError::TranslatorMismatch {
                    name: name.to_string(),
                    role,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(())
    }

    fn handle<H: Clone + 'static>(&self, name: &str) -> StoreResult<H> {
        self.handle
            .downcast_ref::<H>()
            .cloned()
            .ok_or_else(|| StoreError::TypeMismatch {
                name: name.to_string(),
                expected: any::type_name::<H>().to_string(),
            })
    }
}

struct Inner {
    state: StorageState,
    trees: BTreeMap<String, Registration>,
    maps: BTreeMap<String, Registration>,
}

impl Inner {
    fn ensure_loaded(&self) -> StoreResult<()> {
        match self.state {
            StorageState::Loaded => Ok(()),
            StorageState::Unloaded => Err(StoreError::NotLoaded),
            StorageState::Closed => Err(StoreError::Closed),
        }
    }
}

/// The storage facade: named, cached trees and maps over a [`Backend`].
///
/// A facade moves through `Unloaded -> Loaded -> Closed`. Every operation
/// other than [`load`](Storage::load) and [`state`](Storage::state) requires
/// the loaded state.
///
/// The first [`tree`](Storage::tree) or [`map`](Storage::map) call for a
/// name materializes it from the backend and wraps it in a cache-backed
/// adapter. Later calls return the same instance, provided both translators
/// are of the same concrete kind as the first time. Handle creation is
/// serialized under one lock, so concurrent first use of a name is safe.
///
/// Handles share the facade's open flag: after [`close`](Storage::close)
/// their mutators fail and their reads come back empty.
pub struct Storage<B> {
    backend: B,
    config: StoreConfig,
    cache_size: NonZeroUsize,
    open: Arc<AtomicBool>,
    inner: Mutex<Inner>,
}

impl<B: Backend> Storage<B> {
    /// Create an unloaded facade with the default configuration.
    pub fn new(backend: B) -> Self {
        let config = StoreConfig::default();
        let cache_size = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self::build(backend, config, cache_size)
    }

    /// Create an unloaded facade, validating `config` first.
    pub fn from_config(backend: B, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let cache_size = config.cache_capacity()?;
        Ok(Self::build(backend, config, cache_size))
    }

    fn build(backend: B, config: StoreConfig, cache_size: NonZeroUsize) -> Self {
        Self {
            backend,
            config,
            cache_size,
            open: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(Inner {
                state: StorageState::Unloaded,
                trees: BTreeMap::new(),
                maps: BTreeMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> StorageState {
        self.inner.lock().state
    }

    // ---- Lifecycle ----

    /// Prepare the backend. Fails if already loaded or closed.
    pub fn load(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            StorageState::Loaded => return Err(StoreError::AlreadyLoaded),
            StorageState::Closed => return Err(StoreError::Closed),
            StorageState::Unloaded => {}
        }
        self.backend.load()?;
        inner.state = StorageState::Loaded;
        self.open.store(true, Ordering::Release);
        info!(cache_size = self.cache_size.get(), "storage loaded");
        Ok(())
    }

    /// Persist (when configured to) and close. If persisting fails the
    /// facade stays loaded so the caller can retry.
    pub fn close(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_loaded()?;
        if self.config.persist_on_close {
            if let Err(err) = self.backend.persist() {
                warn!(error = %err, "persist on close failed; storage remains loaded");
                return Err(err);
            }
        }
        let (trees, maps) = (inner.trees.len(), inner.maps.len());
        inner.trees.clear();
        inner.maps.clear();
        inner.state = StorageState::Closed;
        self.open.store(false, Ordering::Release);
        info!(trees, maps, "storage closed");
        Ok(())
    }

    /// Save every open tree and map now.
    pub fn persist(&self) -> StoreResult<()> {
        let inner = self.inner.lock();
        inner.ensure_loaded()?;
        self.backend.persist()
    }

    // ---- Named trees ----

    /// Open the named tree, materializing it on first use with the options
    /// derived from the configuration.
    pub fn tree<K, V, KT, VT>(
        &self,
        name: &str,
        key_translator: KT,
        value_translator: VT,
    ) -> StoreResult<CachedTree<K, V>>
    where
        K: StoreKey,
        V: StoreValue,
        KT: Translator<K>,
        VT: Translator<V>,
    {
        self.tree_with_options(name, key_translator, value_translator, self.config.tree_options())
    }

    /// Open the named tree, materializing it on first use with `options`.
    ///
    /// `options` only apply when this call materializes the tree; a tree
    /// that is already open keeps the options it was opened with.
    pub fn tree_with_options<K, V, KT, VT>(
        &self,
        name: &str,
        key_translator: KT,
        value_translator: VT,
        options: TreeOptions<V>,
    ) -> StoreResult<CachedTree<K, V>>
    where
        K: StoreKey,
        V: StoreValue,
        KT: Translator<K>,
        VT: Translator<V>,
    {
        let mut inner = self.inner.lock();
        inner.ensure_loaded()?;
        validate_name(name)?;
        let (key_kind, value_kind) = (key_translator.kind(), value_translator.kind());

        if let Some(registration) = inner.trees.get(name) {
            registration.check_kinds(name, key_kind, value_kind)?;
            return registration.handle(name);
        }

        let graph = self.backend.materialize_tree(
            name,
            Arc::new(key_translator),
            Arc::new(value_translator),
            options,
        )?;
        let tree = CachedTree::attached(name, graph, self.cache_size, Arc::clone(&self.open));
        inner.trees.insert(
            name.to_string(),
            Registration {
                handle: Box::new(tree.clone()),
                key_kind,
                value_kind,
            },
        );
        debug!(table = name, keys = %key_kind, values = %value_kind, "opened tree");
        Ok(tree)
    }

    /// Drop the named tree from the registry and the backend. Returns
    /// whether it existed.
    pub fn delete_tree(&self, name: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        inner.ensure_loaded()?;
        validate_name(name)?;
        let existed = self.backend.delete_tree(name)?;
        inner.trees.remove(name);
        debug!(table = name, existed, "deleted tree");
        Ok(existed)
    }

    /// Names of the trees opened through this facade, sorted.
    pub fn open_trees(&self) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock();
        inner.ensure_loaded()?;
        Ok(inner.trees.keys().cloned().collect())
    }

    // ---- Named maps ----

    /// Open the named map, materializing it on first use.
    pub fn map<K, V, KT, VT>(
        &self,
        name: &str,
        key_translator: KT,
        value_translator: VT,
    ) -> StoreResult<CachedMap<K, V>>
    where
        K: StoreKey,
        V: StoreValue,
        KT: Translator<K>,
        VT: Translator<V>,
    {
        let mut inner = self.inner.lock();
        inner.ensure_loaded()?;
        validate_name(name)?;
        let (key_kind, value_kind) = (key_translator.kind(), value_translator.kind());

        if let Some(registration) = inner.maps.get(name) {
            registration.check_kinds(name, key_kind, value_kind)?;
            return registration.handle(name);
        }

        let handle = self.backend.materialize_map(
            name,
            Arc::new(key_translator),
            Arc::new(value_translator),
        )?;
        let map = CachedMap::attached(name, handle, self.cache_size, Arc::clone(&self.open));
        inner.maps.insert(
            name.to_string(),
            Registration {
                handle: Box::new(map.clone()),
                key_kind,
                value_kind,
            },
        );
        debug!(table = name, keys = %key_kind, values = %value_kind, "opened map");
        Ok(map)
    }

    pub fn delete_map(&self, name: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        inner.ensure_loaded()?;
        validate_name(name)?;
        let existed = self.backend.delete_map(name)?;
        inner.maps.remove(name);
        debug!(table = name, existed, "deleted map");
        Ok(existed)
    }

    pub fn open_maps(&self) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock();
        inner.ensure_loaded()?;
        Ok(inner.maps.keys().cloned().collect())
    }

    // ---- Queries ----

    /// Number of trees and maps the backend holds, open or stored.
    pub fn size(&self) -> StoreResult<usize> {
        let inner = self.inner.lock();
        inner.ensure_loaded()?;
        Ok(self.backend.tree_names()?.len() + self.backend.map_names()?.len())
    }
}

impl Storage<SnapshotBackend<MemoryTables>> {
    /// An unloaded facade over in-memory tables.
    pub fn in_memory() -> Self {
        Self::new(SnapshotBackend::new(MemoryTables::new()))
    }
}

impl Storage<SnapshotBackend<FileTables>> {
    /// An unloaded facade over `config.data_dir`.
    pub fn open_dir(config: StoreConfig) -> StoreResult<Self> {
        let dir = config.data_dir.clone().ok_or_else(|| {
            StoreError::InvalidConfig("data_dir is required for file storage".into())
        })?;
        Self::from_config(SnapshotBackend::new(FileTables::new(dir)), config)
    }
}

impl<B> fmt::Debug for Storage<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Storage")
            .field("state", &inner.state)
            .field("trees", &inner.trees.keys().collect::<Vec<_>>())
            .field("maps", &inner.maps.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
