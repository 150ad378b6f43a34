//! The trie engine: one arena node per path prefix.
//!
//! [`TrieTree`] owns an arena of [`Node`]s. Slot 0 is the root, which always
//! exists. Nodes are created lazily when a path is written and freed eagerly
//! when a removal leaves them without a value and without children.
//!
//! # Invariants
//!
//! - No reachable non-root node is garbage (valueless and childless).
//! - `len()` equals the number of nodes holding a value; it is maintained by
//!   insertion and removal and never recomputed by traversal.
//! - Traversal is depth-first pre-order with siblings in the child map's
//!   natural order.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::ops::ControlFlow;

use tracing::trace;

use crate::error::{GraphError, GraphResult};
use crate::graph::{graph_eq, graph_hash, Entry, Graph};
use crate::node::{ChildMap, HashStrategy, Node, NodeId, NodeStrategy};
use crate::options::TreeOptions;

/// A path-keyed trie. `S` selects how children are indexed; the default is
/// hash-indexed.
pub struct TrieTree<K, V, S = HashStrategy>
where
    S: NodeStrategy<K>,
{
    strategy: S,
    nodes: Vec<Node<K, V, S::Children>>,
    /// Recycled arena slots.
    free: Vec<NodeId>,
    mappings: usize,
    options: TreeOptions<V>,
}

impl<K, V, S: NodeStrategy<K>> TrieTree<K, V, S> {
    /// Create an empty tree with default options.
    pub fn new() -> Self {
        Self::with_strategy(S::default(), TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions<V>) -> Self {
        Self::with_strategy(S::default(), options)
    }

    pub fn with_strategy(strategy: S, options: TreeOptions<V>) -> Self {
        let root = strategy.make_root();
        Self {
            strategy,
            nodes: vec![root],
            free: Vec::new(),
            mappings: 0,
            options,
        }
    }

    pub fn options(&self) -> &TreeOptions<V> {
        &self.options
    }

    pub fn root(&self) -> &Node<K, V, S::Children> {
        &self.nodes[NodeId::ROOT.0]
    }

    /// The node behind `id`. Ids come from [`get_descendant`] and stay valid
    /// until the next removal.
    ///
    /// [`get_descendant`]: TrieTree::get_descendant
    pub fn node(&self, id: NodeId) -> &Node<K, V, S::Children> {
        &self.nodes[id.0]
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Follow `path` from the root without creating anything.
    pub fn get_descendant(&self, path: &[K]) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for key in path {
            current = self.nodes[current.0].children().child(key)?;
        }
        Some(current)
    }

    pub fn get_ref(&self, path: &[K]) -> Option<&V> {
        let id = self.get_descendant(path)?;
        self.nodes[id.0].value()
    }

    pub fn get_mut(&mut self, path: &[K]) -> Option<&mut V> {
        let id = self.get_descendant(path)?;
        self.nodes[id.0].value_mut()
    }

    fn alloc(&mut self, node: Node<K, V, S::Children>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.0] = self.strategy.make_root();
        self.free.push(id);
    }

    fn check_path(&self, path: &[K]) -> GraphResult<()> {
        if path.is_empty() && !self.options.allow_root_value {
            return Err(GraphError::EmptyPath);
        }
        Ok(())
    }

    /// Remove the mapping at `path`, then detach every ancestor the removal
    /// left valueless and childless, walking back toward the root.
    fn remove_mapping(&mut self, path: &[K]) -> Option<V> {
        let mut chain = Vec::with_capacity(path.len() + 1);
        let mut current = NodeId::ROOT;
        chain.push(current);
        for key in path {
            current = self.nodes[current.0].children().child(key)?;
            chain.push(current);
        }

        let removed = self.nodes[current.0].take_value()?;
        self.mappings -= 1;

        let mut pruned = 0usize;
        for depth in (1..chain.len()).rev() {
            let id = chain[depth];
            if !self.nodes[id.0].is_garbage() {
                break;
            }
            let parent = chain[depth - 1];
            self.nodes[parent.0]
                .children_mut()
                .remove_child(&path[depth - 1]);
            self.release(id);
            pruned += 1;
        }
        if pruned > 0 {
            trace!(pruned, depth = path.len(), "pruned empty nodes");
        }

        Some(removed)
    }
}

impl<K: Clone, V, S: NodeStrategy<K>> TrieTree<K, V, S> {
    /// Follow `path` from the root, creating each missing child on the way.
    pub fn get_or_create_descendant(&mut self, path: &[K]) -> NodeId {
        let mut current = NodeId::ROOT;
        for key in path {
            current = match self.nodes[current.0].children().child(key) {
                Some(child) => child,
                None => {
                    let node = self.strategy.make_child_instance(key.clone());
                    let child = self.alloc(node);
                    self.nodes[current.0]
                        .children_mut()
                        .insert_child(key.clone(), child);
                    child
                }
            };
        }
        current
    }

    fn insert(&mut self, path: &[K], value: V) -> Option<V> {
        let id = self.get_or_create_descendant(path);
        let previous = self.nodes[id.0].set_value(value);
        if previous.is_none() {
            self.mappings += 1;
        }
        previous
    }

    /// Depth-first pre-order walk over every mapping. Stops early when the
    /// visitor breaks.
    pub fn walk<B>(&self, mut visit: impl FnMut(&[K], &V) -> ControlFlow<B>) -> Option<B> {
        let mut path: Vec<K> = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(NodeId::ROOT, 0)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id.0];
            if let Some(key) = node.key() {
                path.truncate(depth - 1);
                path.push(key.clone());
            }
            if let Some(value) = node.value() {
                if let ControlFlow::Break(b) = visit(&path, value) {
                    return Some(b);
                }
            }
            for (_, child) in node.children().children().into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        None
    }

    /// The first path (in traversal order) whose value equals `value`.
    pub fn find_value(&self, value: &V) -> Option<Vec<K>>
    where
        V: PartialEq,
    {
        self.walk(|path, candidate| {
            if candidate == value {
                ControlFlow::Break(path.to_vec())
            } else {
                ControlFlow::Continue(())
            }
        })
    }
}

impl<K, V, S: NodeStrategy<K>> Default for TrieTree<K, V, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Graph<K, V> for TrieTree<K, V, S>
where
    K: Clone,
    V: Clone + PartialEq,
    S: NodeStrategy<K>,
{
    fn contains_path(&self, path: &[K]) -> bool {
        self.get_ref(path).is_some()
    }

    fn contains_value(&self, value: &V) -> bool {
        self.find_value(value).is_some()
    }

    fn get(&self, path: &[K]) -> Option<V> {
        self.get_ref(path).cloned()
    }

    fn get_all(&self, path: &[K]) -> Vec<V> {
        let mut values = Vec::new();
        let mut current = NodeId::ROOT;
        for key in path {
            match self.nodes[current.0].children().child(key) {
                Some(child) => current = child,
                None => break,
            }
            if let Some(value) = self.nodes[current.0].value() {
                values.push(value.clone());
            }
        }
        values
    }

    fn put(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.check_path(path)?;
        Ok(self.insert(path, value))
    }

    fn put_if_absent(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        self.check_path(path)?;
        if let Some(current) = self.get_ref(path) {
            if !self.options.null_policy.treats_as_absent(current) {
                return Ok(Some(current.clone()));
            }
        }
        self.insert(path, value);
        Ok(None)
    }

    fn remove(&mut self, path: &[K]) -> GraphResult<Option<V>> {
        Ok(self.remove_mapping(path))
    }

    fn replace(&mut self, path: &[K], value: V) -> GraphResult<Option<V>> {
        let policy = self.options.null_policy;
        match self.get_mut(path) {
            Some(slot) if !policy.treats_as_absent(slot) => Ok(Some(mem::replace(slot, value))),
            _ => Ok(None),
        }
    }

    fn replace_if(&mut self, path: &[K], old: &V, new: V) -> GraphResult<bool> {
        match self.get_mut(path) {
            Some(slot) if *slot == *old => {
                *slot = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn entries(&self) -> Vec<Entry<K, V>> {
        let mut entries = Vec::with_capacity(self.mappings);
        self.walk::<()>(|path, value| {
            entries.push(Entry::new(path.to_vec(), value.clone()));
            ControlFlow::Continue(())
        });
        entries
    }

    fn len(&self) -> usize {
        self.mappings
    }

    fn clear(&mut self) -> GraphResult<()> {
        self.nodes.clear();
        self.nodes.push(self.strategy.make_root());
        self.free.clear();
        self.mappings = 0;
        Ok(())
    }
}

impl<K, V, S, G> PartialEq<G> for TrieTree<K, V, S>
where
    K: Clone,
    V: Clone + PartialEq,
    S: NodeStrategy<K>,
    G: Graph<K, V>,
{
    fn eq(&self, other: &G) -> bool {
        graph_eq(self, other)
    }
}

impl<K, V, S> Eq for TrieTree<K, V, S>
where
    K: Clone,
    V: Clone + Eq,
    S: NodeStrategy<K>,
{
}

impl<K, V, S> Hash for TrieTree<K, V, S>
where
    K: Clone + Hash,
    V: Clone + PartialEq + Hash,
    S: NodeStrategy<K>,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(graph_hash(self));
    }
}

impl<K, V, S> fmt::Debug for TrieTree<K, V, S>
where
    K: Clone + fmt::Debug,
    V: fmt::Debug,
    S: NodeStrategy<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        self.walk::<()>(|path, value| {
            map.entry(&path, value);
            ControlFlow::Continue(())
        });
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::OrderedStrategy;
    use crate::options::NullPolicy;

    fn p(parts: &[&'static str]) -> Vec<&'static str> {
        parts.to_vec()
    }

    fn ordered() -> TrieTree<&'static str, i32, OrderedStrategy> {
        TrieTree::new()
    }

    // -----------------------------------------------------------------------
    // Basic mapping semantics
    // -----------------------------------------------------------------------

    #[test]
    fn empty_tree() {
        let tree: TrieTree<&str, i32> = TrieTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.node_count(), 1);
        assert!(!tree.contains_path(&p(&["a"])));
        assert_eq!(tree.get(&p(&["a"])), None);
    }

    #[test]
    fn put_and_get() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        assert_eq!(tree.put(&p(&["a", "b"]), 1).unwrap(), None);
        assert_eq!(tree.get(&p(&["a", "b"])), Some(1));
        assert!(tree.contains_path(&p(&["a", "b"])));
        assert!(!tree.contains_path(&p(&["a"])));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn put_replaces_and_returns_previous() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a"]), 1).unwrap();
        assert_eq!(tree.put(&p(&["a"]), 2).unwrap(), Some(1));
        assert_eq!(tree.get(&p(&["a"])), Some(2));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn empty_path_rejected_by_default() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        assert_eq!(tree.put(&[], 1), Err(GraphError::EmptyPath));
        assert_eq!(tree.put_if_absent(&[], 1), Err(GraphError::EmptyPath));
        assert!(tree.is_empty());
    }

    #[test]
    fn root_mapping_when_allowed() {
        let mut tree: TrieTree<&str, i32> =
            TrieTree::with_options(TreeOptions::default().allow_root_value(true));
        tree.put(&[], 9).unwrap();
        assert!(tree.contains_path(&[]));
        assert_eq!(tree.get(&[]), Some(9));
        // get_all only reports non-empty prefixes.
        assert!(tree.get_all(&p(&["x"])).is_empty());
        assert_eq!(tree.remove(&[]).unwrap(), Some(9));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn null_valued_mapping_is_distinct_from_absence() {
        let mut tree: TrieTree<&str, Option<i32>> = TrieTree::new();
        tree.put(&p(&["a"]), None).unwrap();
        assert!(tree.contains_path(&p(&["a"])));
        assert_eq!(tree.get(&p(&["a"])), Some(None));
        assert_eq!(tree.get(&p(&["b"])), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn get_all_skips_unmapped_prefixes() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a"]), 1).unwrap();
        tree.put(&p(&["a", "b", "c"]), 3).unwrap();
        assert_eq!(tree.get_all(&p(&["a", "b", "c", "d"])), vec![1, 3]);
        assert_eq!(tree.get_all(&p(&["z"])), Vec::<i32>::new());
    }

    // -----------------------------------------------------------------------
    // Removal and pruning
    // -----------------------------------------------------------------------

    #[test]
    fn remove_prunes_dead_ancestors() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a", "b"]), 1).unwrap();
        tree.put(&p(&["a", "c"]), 2).unwrap();
        assert_eq!(tree.node_count(), 4);

        assert_eq!(tree.remove(&p(&["a", "b"])).unwrap(), Some(1));
        assert!(!tree.contains_path(&p(&["a"])));
        assert!(tree.contains_path(&p(&["a", "c"])));
        assert_eq!(tree.get(&p(&["a", "c"])), Some(2));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node_count(), 3);
        assert!(tree.get_descendant(&p(&["a", "b"])).is_none());
    }

    #[test]
    fn removing_only_leaf_prunes_whole_chain() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a", "b", "c", "d"]), 1).unwrap();
        assert_eq!(tree.node_count(), 5);
        tree.remove(&p(&["a", "b", "c", "d"])).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert!(tree.get_descendant(&p(&["a"])).is_none());
        assert!(tree.root().is_garbage());
    }

    #[test]
    fn pruning_stops_at_valued_ancestor() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a"]), 1).unwrap();
        tree.put(&p(&["a", "b", "c"]), 2).unwrap();
        tree.remove(&p(&["a", "b", "c"])).unwrap();
        assert!(tree.get_descendant(&p(&["a", "b"])).is_none());
        assert!(tree.get_descendant(&p(&["a"])).is_some());
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn removing_interior_value_keeps_children() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a"]), 1).unwrap();
        tree.put(&p(&["a", "b"]), 2).unwrap();
        assert_eq!(tree.remove(&p(&["a"])).unwrap(), Some(1));
        assert!(!tree.contains_path(&p(&["a"])));
        assert_eq!(tree.get(&p(&["a", "b"])), Some(2));
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a"]), 1).unwrap();
        tree.put(&p(&["b"]), 2).unwrap();
        assert_eq!(tree.remove(&p(&["a"])).unwrap(), Some(1));
        assert_eq!(tree.remove(&p(&["a"])).unwrap(), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn remove_of_unmapped_interior_node_is_noop() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a", "b"]), 1).unwrap();
        assert_eq!(tree.remove(&p(&["a"])).unwrap(), None);
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a", "b"]), 1).unwrap();
        tree.remove(&p(&["a", "b"])).unwrap();
        tree.put(&p(&["x", "y"]), 2).unwrap();
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.get(&p(&["x", "y"])), Some(2));
    }

    // -----------------------------------------------------------------------
    // Conditional mutators
    // -----------------------------------------------------------------------

    #[test]
    fn put_if_absent_keeps_existing() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        assert_eq!(tree.put_if_absent(&p(&["a"]), 1).unwrap(), None);
        assert_eq!(tree.put_if_absent(&p(&["a"]), 2).unwrap(), Some(1));
        assert_eq!(tree.get(&p(&["a"])), Some(1));
    }

    #[test]
    fn put_if_absent_respects_null_policy() {
        let mut permit: TrieTree<&str, Option<i32>> = TrieTree::new();
        permit.put(&p(&["a"]), None).unwrap();
        assert_eq!(permit.put_if_absent(&p(&["a"]), Some(1)).unwrap(), Some(None));
        assert_eq!(permit.get(&p(&["a"])), Some(None));

        let mut absent: TrieTree<&str, Option<i32>> = TrieTree::with_options(
            TreeOptions::default().null_policy(NullPolicy::none_is_absent()),
        );
        absent.put(&p(&["a"]), None).unwrap();
        assert_eq!(absent.put_if_absent(&p(&["a"]), Some(1)).unwrap(), None);
        assert_eq!(absent.get(&p(&["a"])), Some(Some(1)));
        assert_eq!(absent.len(), 1);
    }

    #[test]
    fn replace_only_touches_existing_mappings() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        assert_eq!(tree.replace(&p(&["a"]), 1).unwrap(), None);
        assert!(!tree.contains_path(&p(&["a"])));

        tree.put(&p(&["a"]), 1).unwrap();
        assert_eq!(tree.replace(&p(&["a"]), 2).unwrap(), Some(1));
        assert_eq!(tree.get(&p(&["a"])), Some(2));
    }

    #[test]
    fn replace_skips_null_under_absent_policy() {
        let mut tree: TrieTree<&str, Option<i32>> = TrieTree::with_options(
            TreeOptions::default().null_policy(NullPolicy::none_is_absent()),
        );
        tree.put(&p(&["a"]), None).unwrap();
        assert_eq!(tree.replace(&p(&["a"]), Some(3)).unwrap(), None);
        assert_eq!(tree.get(&p(&["a"])), Some(None));
    }

    #[test]
    fn replace_if_compares_current_value() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a"]), 1).unwrap();
        assert!(!tree.replace_if(&p(&["a"]), &5, 2).unwrap());
        assert!(tree.replace_if(&p(&["a"]), &1, 2).unwrap());
        assert_eq!(tree.get(&p(&["a"])), Some(2));
        assert!(!tree.replace_if(&p(&["b"]), &1, 2).unwrap());
    }

    // -----------------------------------------------------------------------
    // Traversal, equality, hashing
    // -----------------------------------------------------------------------

    #[test]
    fn entries_are_preorder() {
        let mut tree = ordered();
        tree.put(&p(&["b"]), 2).unwrap();
        tree.put(&p(&["a", "z"]), 3).unwrap();
        tree.put(&p(&["a"]), 1).unwrap();
        tree.put(&p(&["a", "c"]), 4).unwrap();

        let paths: Vec<Vec<&str>> = tree.entries().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![p(&["a"]), p(&["a", "c"]), p(&["a", "z"]), p(&["b"])]
        );
    }

    #[test]
    fn debug_renders_map_in_traversal_order() {
        let mut tree = ordered();
        tree.put(&p(&["a", "b"]), 1).unwrap();
        tree.put(&p(&["c"]), 2).unwrap();
        assert_eq!(format!("{tree:?}"), r#"{["a", "b"]: 1, ["c"]: 2}"#);
    }

    #[test]
    fn find_value_returns_first_match() {
        let mut tree = ordered();
        tree.put(&p(&["b"]), 7).unwrap();
        tree.put(&p(&["a", "x"]), 7).unwrap();
        assert_eq!(tree.find_value(&7), Some(p(&["a", "x"])));
        assert!(tree.contains_value(&7));
        assert!(!tree.contains_value(&8));
    }

    #[test]
    fn equality_ignores_layout() {
        let mut hashed: TrieTree<&str, i32> = TrieTree::new();
        let mut sorted = ordered();
        for (path, value) in [(p(&["a", "b"]), 1), (p(&["c"]), 2)] {
            hashed.put(&path, value).unwrap();
            sorted.put(&path, value).unwrap();
        }
        assert!(hashed == sorted);

        let mut h1 = std::collections::hash_map::DefaultHasher::new();
        let mut h2 = std::collections::hash_map::DefaultHasher::new();
        hashed.hash(&mut h1);
        sorted.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());

        sorted.put(&p(&["c"]), 3).unwrap();
        assert!(hashed != sorted);
    }

    #[test]
    fn clear_resets_arena() {
        let mut tree: TrieTree<&str, i32> = TrieTree::new();
        tree.put(&p(&["a", "b"]), 1).unwrap();
        tree.put(&p(&["c"]), 2).unwrap();
        tree.clear().unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.entries().is_empty());
    }

    #[test]
    fn spec_scenario_sibling_removal() {
        let mut tree: TrieTree<String, i32> = TrieTree::new();
        let ab = vec!["a".to_string(), "b".to_string()];
        let ac = vec!["a".to_string(), "c".to_string()];
        tree.put(&ab, 1).unwrap();
        tree.put(&ac, 2).unwrap();
        tree.remove(&ab).unwrap();
        assert!(!tree.contains_path(&["a".to_string()]));
        assert!(tree.contains_path(&ac));
        assert_eq!(tree.get(&ac), Some(2));
        assert_eq!(tree.len(), 1);
    }
}
