//! Storage facade for Arbor.
//!
//! [`Storage`] hands out named trees and maps. Each one is materialized once
//! from a [`Backend`], wrapped in a cache-backed adapter ([`CachedTree`],
//! [`CachedMap`]) and shared by every later caller that asks for the same
//! name with the same translators.
//!
//! ```text
//!   caller --> Storage --> CachedTree --> StatsCache (arbor-cache)
//!                 |             |
//!                 |             +--> TreeHandle (arbor-graph)
//!                 v                        ^
//!              Backend ---- materialize ---+
//!                 |
//!                 +--> TableStorage (MemoryTables | FileTables)
//! ```
//!
//! # Design Rules
//!
//! 1. Handles for one name share a single graph and a single cache.
//! 2. A name is bound to the concrete translator types it was first opened
//!    with; a different pair is rejected, never silently re-bound.
//! 3. Writes reach the cache before the graph. Removals invalidate.
//! 4. Usage errors leave the facade unchanged. Backend errors are reported
//!    once and never retried internally.
//! 5. Closing the facade closes every handle it gave out.

pub mod adapter;
pub mod backend;
pub mod config;
pub mod error;
pub mod map;
pub mod storage;
pub mod translator;

#[cfg(test)]
mod proptests;

pub use adapter::{CachedMap, CachedTree};
pub use backend::{
    validate_name, Backend, FileTables, MapHandle, MemoryTables, SnapshotBackend, SnapshotEntry,
    StoreKey, StoreValue, TableKind, TableSnapshot, TableStorage, TreeHandle,
};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use map::KeyValueMap;
pub use storage::{Storage, StorageState};
pub use translator::{IntegerTranslator, JsonTranslator, StringTranslator, Translator, TranslatorKind};
