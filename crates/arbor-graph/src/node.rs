//! Trie nodes and the child-storage strategies that index them.
//!
//! Nodes live in an arena owned by [`TrieTree`](crate::TrieTree) and refer
//! to their children by [`NodeId`]. There are no parent pointers; removal
//! walks down from the root and keeps its own ancestor chain.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Index of a node inside its tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node. It always exists and is never freed.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Lookup from one key element to the child node it leads to.
pub trait ChildMap<K> {
    fn child(&self, key: &K) -> Option<NodeId>;

    fn insert_child(&mut self, key: K, id: NodeId);

    fn remove_child(&mut self, key: &K) -> Option<NodeId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children in the map's natural iteration order.
    fn children(&self) -> Vec<(&K, NodeId)>;

    fn clear(&mut self);
}

/// One path prefix: the key element leading here, an optional value, and
/// the children reachable by one more element.
#[derive(Clone, Debug)]
pub struct Node<K, V, C> {
    key: Option<K>,
    value: Option<V>,
    children: C,
}

impl<K, V, C> Node<K, V, C> {
    /// The last path element leading to this node; `None` for the root.
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn children(&self) -> &C {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut C {
        &mut self.children
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut V> {
        self.value.as_mut()
    }

    pub(crate) fn set_value(&mut self, value: V) -> Option<V> {
        self.value.replace(value)
    }

    pub(crate) fn take_value(&mut self) -> Option<V> {
        self.value.take()
    }
}

impl<K, V, C: ChildMap<K>> Node<K, V, C> {
    /// A node with neither a value nor children must not stay reachable.
    pub fn is_garbage(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }
}

/// Capability interface selecting how a tree indexes child nodes.
pub trait NodeStrategy<K>: Clone + Default {
    type Children: ChildMap<K>;

    fn make_child_map(&self) -> Self::Children;

    fn make_root<V>(&self) -> Node<K, V, Self::Children> {
        Node {
            key: None,
            value: None,
            children: self.make_child_map(),
        }
    }

    fn make_child_instance<V>(&self, key: K) -> Node<K, V, Self::Children> {
        Node {
            key: Some(key),
            value: None,
            children: self.make_child_map(),
        }
    }
}

/// Hash-indexed children. Traversal order follows the hash map and is
/// stable only while the tree is not mutated.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashStrategy;

#[derive(Clone, Debug)]
pub struct HashChildren<K>(HashMap<K, NodeId>);

impl<K: Hash + Eq> ChildMap<K> for HashChildren<K> {
    fn child(&self, key: &K) -> Option<NodeId> {
        self.0.get(key).copied()
    }

    fn insert_child(&mut self, key: K, id: NodeId) {
        self.0.insert(key, id);
    }

    fn remove_child(&mut self, key: &K) -> Option<NodeId> {
        self.0.remove(key)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn children(&self) -> Vec<(&K, NodeId)> {
        self.0.iter().map(|(k, id)| (k, *id)).collect()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

impl<K: Hash + Eq> NodeStrategy<K> for HashStrategy {
    type Children = HashChildren<K>;

    fn make_child_map(&self) -> Self::Children {
        HashChildren(HashMap::new())
    }
}

/// Ordered children: traversal visits siblings in ascending key order.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderedStrategy;

#[derive(Clone, Debug)]
pub struct OrderedChildren<K>(BTreeMap<K, NodeId>);

impl<K: Ord> ChildMap<K> for OrderedChildren<K> {
    fn child(&self, key: &K) -> Option<NodeId> {
        self.0.get(key).copied()
    }

    fn insert_child(&mut self, key: K, id: NodeId) {
        self.0.insert(key, id);
    }

    fn remove_child(&mut self, key: &K) -> Option<NodeId> {
        self.0.remove(key)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn children(&self) -> Vec<(&K, NodeId)> {
        self.0.iter().map(|(k, id)| (k, *id)).collect()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

impl<K: Ord> NodeStrategy<K> for OrderedStrategy {
    type Children = OrderedChildren<K>;

    fn make_child_map(&self) -> Self::Children {
        OrderedChildren(BTreeMap::new())
    }
}
