use super::*;

use proptest::prelude::*;
use std::collections::HashMap;
use std::num::NonZeroUsize;

#[derive(Clone, Debug)]
enum Op {
    Fetch(u8),
    /// Write-through: change the source, then refresh the cache.
    Write(u8, Option<u16>),
    Delete(u8),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = 0u8..16;
    let op = prop_oneof![
        60 => key.clone().prop_map(Op::Fetch),
        25 => (key.clone(), prop::option::of(any::<u16>())).prop_map(|(k, v)| Op::Write(k, v)),
        15 => key.prop_map(Op::Delete),
    ];
    prop::collection::vec(op, 0..=400)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// A cache kept coherent by update-on-write and invalidate-on-delete
    /// always answers exactly what the source holds.
    #[test]
    fn prop_fetch_agrees_with_source(capacity in 1usize..8, ops in ops_strategy()) {
        let cache: StatsCache<u8, u16> = StatsCache::new(NonZeroUsize::new(capacity).unwrap());
        let mut source: HashMap<u8, Option<u16>> = HashMap::new();
        let mut fetches = 0u64;

        for op in ops {
            match op {
                Op::Fetch(key) => {
                    fetches += 1;
                    let got = cache.fetch(
                        key,
                        |k| source.get(k).copied().flatten(),
                        |k| source.contains_key(k),
                    );
                    let expected = match source.get(&key) {
                        Some(Some(v)) => Fetched::Value(*v),
                        Some(None) => Fetched::Null,
                        None => Fetched::Absent,
                    };
                    prop_assert_eq!(got, expected);
                }
                Op::Write(key, value) => {
                    source.insert(key, value);
                    match value {
                        Some(v) => { cache.update(&key, v); }
                        None => { cache.remove(&key); }
                    }
                }
                Op::Delete(key) => {
                    source.remove(&key);
                    cache.remove(&key);
                }
            }
            prop_assert!(cache.len() <= capacity);
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.requests(), fetches);
        prop_assert_eq!(stats.load_successes + stats.load_failures, stats.misses);
    }
}
