//! Property-Based Tests for the LRU Store
//!
//! Drives random put/get/remove sequences against `LruStore` and a plain
//! `Vec` reference model.
//!
//! # Test Properties
//!
//! 1. **Size Bound**: aggregate size never exceeds `max_size` after a call
//! 2. **Strict LRU Eviction**: a put evicts exactly the oldest entries, never itself
//! 3. **Oversized Rejection**: a value larger than the store changes nothing
//! 4. **Idempotent Remove**: removing an absent key is a no-op

#![cfg(test)]

use proptest::prelude::*;

use super::lru::LruStore;
use crate::error::Error;

const MAX_SIZE: u64 = 100;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u64),
    Get(u8),
    Remove(u8),
}

// =============================================================================
// Property Strategies
// =============================================================================

/// Strategy for a single store operation over a small key space.
/// Sizes run past `MAX_SIZE` so oversized puts are exercised too.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16, 0u64..=MAX_SIZE + 20).prop_map(|(k, s)| Op::Put(k, s)),
        2 => (0u8..16).prop_map(Op::Get),
        1 => (0u8..16).prop_map(Op::Remove),
    ]
}

fn new_store() -> LruStore<u8, u64> {
    LruStore::with_sizer(MAX_SIZE, |_, size: &u64| *size)
}

/// Reference model: entries least- to most-recently-used
#[derive(Default)]
struct Model {
    entries: Vec<(u8, u64)>,
}

impl Model {
    fn total(&self) -> u64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }

    fn take(&mut self, key: u8) -> Option<(u8, u64)> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos))
    }

    /// Returns the keys the put should evict
    fn put(&mut self, key: u8, size: u64) -> Vec<u8> {
        self.take(key);
        self.entries.push((key, size));
        let mut evicted = Vec::new();
        while self.total() > MAX_SIZE {
            evicted.push(self.entries.remove(0).0);
        }
        evicted
    }

    fn keys(&self) -> Vec<u8> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }
}

// =============================================================================
// Model Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: The store matches the model after every operation, which
    /// covers the size bound and strict LRU eviction order.
    #[test]
    fn prop_matches_lru_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut store = new_store();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Put(key, size) if size > MAX_SIZE => {
                    let before = store.size();
                    let result = store.put_with_evictions(key, size);
                    let rejected = matches!(result, Err(Error::CapacityExceeded { .. }));
                    prop_assert!(rejected);
                    prop_assert_eq!(store.size(), before);
                }
                Op::Put(key, size) => {
                    let expected = model.put(key, size);
                    let outcome = store.put_with_evictions(key, size)?;
                    let evicted: Vec<u8> = outcome.evicted.iter().map(|e| e.key).collect();
                    prop_assert!(!evicted.contains(&key), "put evicted its own key {}", key);
                    prop_assert_eq!(evicted, expected);
                }
                Op::Get(key) => {
                    let hit = store.get(&key).is_some();
                    let expected = model.take(key);
                    if let Some(entry) = expected {
                        model.entries.push(entry);
                    }
                    prop_assert_eq!(hit, expected.is_some());
                }
                Op::Remove(key) => {
                    let removed = store.remove(&key);
                    prop_assert_eq!(removed, model.take(key).map(|(_, s)| s));
                }
            }

            prop_assert!(store.size() <= store.max_size());
            prop_assert_eq!(store.size(), model.total());
            prop_assert_eq!(store.keys().copied().collect::<Vec<_>>(), model.keys());
        }
    }

    /// Property: Removing an absent key returns nothing and leaves size unchanged.
    #[test]
    fn prop_remove_absent_is_noop(
        sizes in prop::collection::vec(1u64..=20, 0..5),
        absent in 100u8..=255,
    ) {
        let mut store = new_store();
        for (key, size) in sizes.iter().enumerate() {
            store.put(key as u8, *size)?;
        }
        let before = store.size();

        prop_assert_eq!(store.remove(&absent), None);
        prop_assert_eq!(store.remove(&absent), None);
        prop_assert_eq!(store.size(), before);
    }

    /// Property: Put then get returns the value when nothing evicted it.
    #[test]
    fn prop_put_then_get(key in any::<u8>(), size in 0u64..=MAX_SIZE) {
        let mut store = new_store();
        store.put(key, size)?;
        prop_assert_eq!(store.get(&key).copied(), Some(size));
    }
}
