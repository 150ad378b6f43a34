use super::*;

use arbor_graph::{Graph, GraphViews, TrieTree};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Get(Vec<u8>),
    Put(Vec<u8>, u16),
    Remove(Vec<u8>),
    ReplaceIf(Vec<u8>, u16, u16),
    /// Bulk removal through the value view.
    DropValuesBelow(u16),
}

fn path_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..3, 1..=3)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let value = 0u16..8;
    let op = prop_oneof![
        40 => path_strategy().prop_map(Op::Get),
        30 => (path_strategy(), value.clone()).prop_map(|(p, v)| Op::Put(p, v)),
        15 => path_strategy().prop_map(Op::Remove),
        10 => (path_strategy(), value.clone(), value.clone())
            .prop_map(|(p, old, new)| Op::ReplaceIf(p, old, new)),
        5 => value.prop_map(Op::DropValuesBelow),
    ];
    prop::collection::vec(op, 0..=200)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// A cached tree from the facade behaves exactly like an uncached trie,
    /// whatever the cache capacity.
    #[test]
    fn prop_cached_tree_matches_plain_trie(cache_size in 1usize..6, ops in ops_strategy()) {
        let config = StoreConfig { cache_size, ..StoreConfig::default() };
        let storage = Storage::from_config(SnapshotBackend::new(MemoryTables::new()), config).unwrap();
        storage.load().unwrap();
        let mut cached = storage
            .tree("t", JsonTranslator::<u8>::new(), JsonTranslator::<u16>::new())
            .unwrap();
        let mut model: TrieTree<u8, u16> = TrieTree::new();

        for op in ops {
            match op {
                Op::Get(path) => {
                    prop_assert_eq!(cached.get(&path), model.get(&path));
                    prop_assert_eq!(cached.contains_path(&path), model.contains_path(&path));
                }
                Op::Put(path, value) => {
                    prop_assert_eq!(cached.put(&path, value).unwrap(), model.put(&path, value).unwrap());
                }
                Op::Remove(path) => {
                    prop_assert_eq!(cached.remove(&path).unwrap(), model.remove(&path).unwrap());
                }
                Op::ReplaceIf(path, old, new) => {
                    prop_assert_eq!(
                        cached.replace_if(&path, &old, new).unwrap(),
                        model.replace_if(&path, &old, new).unwrap()
                    );
                }
                Op::DropValuesBelow(floor) => {
                    prop_assert_eq!(
                        cached.values().retain(|v| *v >= floor).unwrap(),
                        model.values().retain(|v| *v >= floor).unwrap()
                    );
                }
            }
            prop_assert_eq!(cached.len(), model.len());
            prop_assert!(cached.cached_len() <= cache_size);
        }

        let mut expected = model.entries();
        let mut actual = cached.entries();
        expected.sort_by(|a, b| a.path().cmp(b.path()));
        actual.sort_by(|a, b| a.path().cmp(b.path()));
        prop_assert_eq!(actual, expected);
    }
}
