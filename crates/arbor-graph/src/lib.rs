//! Path-keyed trees for Arbor.
//!
//! A path is a sequence of key elements; every non-empty path may hold one
//! value. This crate provides the [`Graph`] contract and the structures that
//! implement it.
//!
//! # Engines
//!
//! - [`TrieTree`] -- arena-backed trie sharing common prefixes. Nodes are
//!   created lazily on write and pruned eagerly on removal.
//! - [`FlatTree`] -- a single hash map keyed by the whole path.
//!
//! # Decorators
//!
//! - [`SyncGraph`] -- shares one graph between threads behind a lock.
//! - [`ReadOnlyGraph`] -- rejects every mutator with [`GraphError::ReadOnly`].
//!
//! # Views
//!
//! [`GraphViews`] exposes live path, value and entry collections over any
//! graph. Removing through a view or one of its cursors removes the mapping
//! from the graph, pruning included.
//!
//! # Design Rules
//!
//! 1. `None` from a lookup always means "no mapping". Null-valued mappings
//!    are expressed through a nullable value type.
//! 2. The root path holds no mapping unless [`TreeOptions::allow_root_value`]
//!    is set.
//! 3. Equality and hashing depend only on the set of mappings, never on the
//!    engine or its layout.

pub mod error;
pub mod flat;
pub mod graph;
pub mod node;
pub mod options;
pub mod sync;
pub mod tree;
pub mod views;

#[cfg(test)]
mod proptests;

pub use error::{GraphError, GraphResult};
pub use flat::FlatTree;
pub use graph::{graph_eq, graph_hash, Entry, Graph};
pub use node::{
    ChildMap, HashChildren, HashStrategy, Node, NodeId, NodeStrategy, OrderedChildren,
    OrderedStrategy,
};
pub use options::{NullPolicy, TreeOptions};
pub use sync::{ReadOnlyGraph, SyncGraph};
pub use tree::TrieTree;
pub use views::{
    Cursor, EntryCursor, EntryItems, EntrySet, GraphViews, PathCursor, PathItems, PathSet,
    Projection, ValueCursor, ValueItems, Values,
};
