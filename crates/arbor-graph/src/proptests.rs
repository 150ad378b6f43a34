use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

/// Walk every reachable node and check that no non-root node is garbage and
/// that the arena holds no unreachable live nodes.
fn validate_trie(t: &TrieTree<u8, u32>) {
    let mut stack = vec![NodeId::ROOT];
    let mut reachable = 0usize;
    let mut valued = 0usize;
    while let Some(id) = stack.pop() {
        reachable += 1;
        let node = t.node(id);
        if node.has_value() {
            valued += 1;
        }
        if id != NodeId::ROOT {
            assert!(!node.is_garbage(), "reachable node {id:?} is garbage");
        }
        for (_, child) in node.children().children() {
            stack.push(child);
        }
    }
    assert_eq!(reachable, t.node_count(), "arena leaks live nodes");
    assert_eq!(valued, t.len(), "len must match valued nodes");
}

#[derive(Clone, Debug)]
enum Op {
    Put(Vec<u8>, u32),
    PutIfAbsent(Vec<u8>, u32),
    Remove(Vec<u8>),
    Replace(Vec<u8>, u32),
}

fn path_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // Small alphabet and shallow depth so paths share prefixes often.
    prop::collection::vec(0u8..4, 1..=5)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let path = path_strategy();
    let op = prop_oneof![
        45 => (path.clone(), any::<u32>()).prop_map(|(p, v)| Op::Put(p, v)),
        10 => (path.clone(), any::<u32>()).prop_map(|(p, v)| Op::PutIfAbsent(p, v)),
        35 => path.clone().prop_map(Op::Remove),
        10 => (path.clone(), any::<u32>()).prop_map(|(p, v)| Op::Replace(p, v)),
    ];
    prop::collection::vec(op, 0..=300)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_trie_matches_model(ops in ops_strategy(), query in path_strategy()) {
        let mut trie: TrieTree<u8, u32> = TrieTree::new();
        let mut flat: FlatTree<u8, u32> = FlatTree::new();
        let mut model: BTreeMap<Vec<u8>, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(path, value) => {
                    let old = trie.put(&path, value).unwrap();
                    flat.put(&path, value).unwrap();
                    prop_assert_eq!(old, model.insert(path, value));
                }
                Op::PutIfAbsent(path, value) => {
                    let kept = trie.put_if_absent(&path, value).unwrap();
                    flat.put_if_absent(&path, value).unwrap();
                    let expected = model.get(&path).copied();
                    if expected.is_none() {
                        model.insert(path, value);
                    }
                    prop_assert_eq!(kept, expected);
                }
                Op::Remove(path) => {
                    let old = trie.remove(&path).unwrap();
                    flat.remove(&path).unwrap();
                    prop_assert_eq!(old, model.remove(&path));
                }
                Op::Replace(path, value) => {
                    let old = trie.replace(&path, value).unwrap();
                    flat.replace(&path, value).unwrap();
                    let expected = model.get_mut(&path).map(|slot| std::mem::replace(slot, value));
                    prop_assert_eq!(old, expected);
                }
            }
            prop_assert_eq!(trie.len(), model.len());
        }

        validate_trie(&trie);

        let present = trie.entries().iter().filter(|e| trie.contains_path(&e.path)).count();
        prop_assert_eq!(present, trie.len());
        prop_assert_eq!(trie.get(&query), model.get(&query).copied());
        prop_assert!(trie == flat);
        prop_assert_eq!(graph_hash(&trie), graph_hash(&flat));

        let mut got: Vec<(Vec<u8>, u32)> = trie.entries().into_iter().map(Entry::into_parts).collect();
        got.sort();
        let expected: Vec<(Vec<u8>, u32)> = model.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_removing_everything_leaves_only_root(paths in prop::collection::vec(path_strategy(), 0..=64)) {
        let mut trie: TrieTree<u8, u32> = TrieTree::new();
        for (i, path) in paths.iter().enumerate() {
            trie.put(path, i as u32).unwrap();
        }
        let mut view = trie.path_set();
        let mut cursor = view.iter();
        while cursor.next().is_some() {
            cursor.remove().unwrap();
        }
        prop_assert!(trie.is_empty());
        prop_assert_eq!(trie.node_count(), 1);
    }

    #[test]
    fn prop_get_all_lists_mapped_prefixes(paths in prop::collection::vec(path_strategy(), 0..=32), query in path_strategy()) {
        let mut trie: TrieTree<u8, u32> = TrieTree::new();
        for (i, path) in paths.iter().enumerate() {
            trie.put(path, i as u32).unwrap();
        }
        let expected: Vec<u32> = (1..=query.len())
            .filter_map(|end| trie.get(&query[..end]))
            .collect();
        prop_assert_eq!(trie.get_all(&query), expected);
    }
}
