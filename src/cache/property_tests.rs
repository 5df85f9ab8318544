//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check `KeyedLru` against a naive reference model.

use proptest::prelude::*;
use std::collections::VecDeque;

use crate::cache::KeyedLru;

// == Reference Model ==
/// Linear-scan LRU: front = least recently used.
struct ModelLru {
    capacity: usize,
    entries: VecDeque<(u8, u32)>,
}

impl ModelLru {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    fn get(&mut self, key: u8) -> Option<u32> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(pos)?;
        self.entries.push_back(entry);
        Some(entry.1)
    }

    fn put(&mut self, key: u8, value: u32) {
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries.remove(pos);
        } else if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, value));
    }

    fn evict(&mut self, key: u8) {
        self.entries.retain(|(k, _)| *k != key);
    }
}

// == Strategies ==
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: u8, value: u32 },
    Get { key: u8 },
    Evict { key: u8 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (0u8..24, any::<u32>()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        3 => (0u8..24).prop_map(|key| CacheOp::Get { key }),
        1 => (0u8..24).prop_map(|key| CacheOp::Evict { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Every observable result and the final recency order match the model.
    #[test]
    fn prop_matches_reference_model(
        capacity in 1usize..8,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let store = KeyedLru::new(capacity);
        let mut model = ModelLru::new(capacity);

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(key, value);
                    model.put(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(&key), model.get(key));
                }
                CacheOp::Evict { key } => {
                    store.evict(&key);
                    model.evict(key);
                }
            }
            prop_assert!(store.len() <= capacity);
        }

        let expected: Vec<u8> = model.entries.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(store.keys_by_recency(), expected);
    }

    // A key is gone after `capacity` distinct newer insertions without a re-insert.
    #[test]
    fn prop_evicted_after_capacity_distinct_inserts(
        capacity in 1usize..10,
        key in any::<u16>()
    ) {
        let store = KeyedLru::new(capacity);
        store.put(key, 0u32);

        for offset in 1..=capacity {
            let other = key.wrapping_add(offset as u16);
            store.put(other, offset as u32);
        }

        prop_assert_eq!(store.get(&key), None);
        prop_assert_eq!(store.len(), capacity);
    }

    // The entry count never exceeds capacity for any insertion sequence.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..50,
        keys in prop::collection::vec(any::<u16>(), 1..300)
    ) {
        let store = KeyedLru::new(capacity);

        for key in keys {
            store.put(key, ());
            prop_assert!(
                store.len() <= capacity,
                "Cache size {} exceeds max {}",
                store.len(),
                capacity
            );
        }
        prop_assert_eq!(store.keys_by_recency().len(), store.len());
    }
}
