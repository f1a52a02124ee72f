//! LRU Store - Size-Bounded Ordered Map
//!
//! Generic key/value store with a maximum aggregate size, ordered from
//! least-recently-used to most-recently-used.
//!
//! # Design
//!
//! - Entry sizes come from an injected `size_of(key, value)` function and are
//!   computed once, at insertion
//! - Removals are reported to an optional injected listener
//! - Recency is a monotonically increasing tick; `BTreeMap<tick, key>` keeps the
//!   eviction order so the oldest entry is always `first`
//! - Not synchronized: the memory and disk tiers wrap it in a lock

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Per-entry sizing function
pub type SizeFn<K, V> = Box<dyn Fn(&K, &V) -> u64 + Send + Sync>;

/// Removal notification callback
pub type RemovalListener<K, V> = Box<dyn FnMut(Removal<'_, K, V>) + Send>;

/// Why an entry left the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Dropped to make room, or wiped by `evict_all`
    Evicted,
    /// Overwritten by a `put` with the same key
    Replaced,
    /// Removed explicitly
    Removed,
}

/// Notification passed to the removal listener
#[derive(Debug)]
pub struct Removal<'a, K, V> {
    pub cause: RemovalCause,
    pub key: &'a K,
    pub old_value: &'a V,
    /// Set only for `RemovalCause::Replaced`
    pub new_value: Option<&'a V>,
}

impl<K, V> Removal<'_, K, V> {
    /// True when the entry was evicted rather than replaced or removed
    pub fn evicted(&self) -> bool {
        self.cause == RemovalCause::Evicted
    }
}

/// An entry pushed out of the store by a `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted<K, V> {
    pub key: K,
    pub value: V,
}

/// Result of a demotion-aware put
#[derive(Debug)]
pub struct PutOutcome<K, V> {
    /// Value previously stored under the same key
    pub previous: Option<V>,
    /// Entries evicted by this call, least-recently-used first
    pub evicted: Vec<Evicted<K, V>>,
}

struct Slot<V> {
    value: V,
    size: u64,
    tick: u64,
}

/// Size-bounded LRU store
pub struct LruStore<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// tick -> key, oldest first
    order: BTreeMap<u64, K>,
    next_tick: u64,
    size: u64,
    max_size: u64,
    size_of: SizeFn<K, V>,
    on_removed: Option<RemovalListener<K, V>>,
}

impl<K, V> LruStore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an entry-counting store (every entry has size 1)
    pub fn new(max_size: u64) -> Self {
        Self::with_sizer(max_size, |_, _| 1)
    }

    /// Create a store with a custom sizing function
    pub fn with_sizer<F>(max_size: u64, size_of: F) -> Self
    where
        F: Fn(&K, &V) -> u64 + Send + Sync + 'static,
    {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
            size: 0,
            max_size,
            size_of: Box::new(size_of),
            on_removed: None,
        }
    }

    /// Install a removal listener
    pub fn on_removed<F>(mut self, listener: F) -> Self
    where
        F: FnMut(Removal<'_, K, V>) + Send + 'static,
    {
        self.on_removed = Some(Box::new(listener));
        self
    }

    /// Insert or replace `key`, evicting least-recently-used entries as needed.
    ///
    /// Fails with `Error::CapacityExceeded` when the value alone is larger than
    /// the store; nothing is inserted or evicted in that case.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.insert(key, value, false).map(|outcome| outcome.previous)
    }

    /// Like [`put`](Self::put), but also returns every entry evicted by this
    /// call so the caller can move them elsewhere.
    pub fn put_with_evictions(&mut self, key: K, value: V) -> Result<PutOutcome<K, V>> {
        self.insert(key, value, true)
    }

    fn insert(&mut self, key: K, value: V, collect: bool) -> Result<PutOutcome<K, V>> {
        let size = (self.size_of)(&key, &value);
        if size > self.max_size {
            return Err(Error::CapacityExceeded {
                size,
                max_size: self.max_size,
            });
        }

        let tick = self.bump_tick();
        let old = self.entries.insert(key.clone(), Slot { value, size, tick });
        self.order.insert(tick, key.clone());

        let previous = old.map(|slot| {
            self.order.remove(&slot.tick);
            self.size -= slot.size;
            slot.value
        });
        self.size += size;

        if let (Some(old_value), Some(listener)) = (previous.as_ref(), self.on_removed.as_mut()) {
            listener(Removal {
                cause: RemovalCause::Replaced,
                key: &key,
                old_value,
                new_value: self.entries.get(&key).map(|slot| &slot.value),
            });
        }

        let evicted = self.trim(&key, collect);
        Ok(PutOutcome { previous, evicted })
    }

    /// Evict from the LRU end until the store fits, never touching `keep`
    fn trim(&mut self, keep: &K, collect: bool) -> Vec<Evicted<K, V>> {
        let mut evicted = Vec::new();

        while self.size > self.max_size {
            let Some((tick, lru_key)) = self.order.pop_first() else {
                break;
            };
            if &lru_key == keep {
                self.order.insert(tick, lru_key);
                break;
            }
            let Some(slot) = self.entries.remove(&lru_key) else {
                continue;
            };
            self.size -= slot.size;
            self.notify(RemovalCause::Evicted, &lru_key, &slot.value);

            if collect {
                evicted.push(Evicted {
                    key: lru_key,
                    value: slot.value,
                });
            }
        }

        evicted
    }

    /// Get a value and mark it most-recently-used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tick = self.next_tick;
        let slot = self.entries.get_mut(key)?;
        if let Some(owned) = self.order.remove(&slot.tick) {
            self.order.insert(tick, owned);
            slot.tick = tick;
            self.next_tick += 1;
        }
        Some(&slot.value)
    }

    /// Get a value without touching its recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Check if a key is resident
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Remove a key, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        let owned = self.order.remove(&slot.tick);
        self.size -= slot.size;
        if let Some(owned) = owned.as_ref() {
            self.notify(RemovalCause::Removed, owned, &slot.value);
        }
        Some(slot.value)
    }

    /// Remove every entry, oldest first, reporting each as evicted
    pub fn evict_all(&mut self) {
        while let Some((_, key)) = self.order.pop_first() {
            if let Some(slot) = self.entries.remove(&key) {
                self.size -= slot.size;
                self.notify(RemovalCause::Evicted, &key, &slot.value);
            }
        }
        self.entries.clear();
        self.size = 0;
    }

    fn notify(&mut self, cause: RemovalCause, key: &K, old_value: &V) {
        if let Some(listener) = self.on_removed.as_mut() {
            listener(Removal {
                cause,
                key,
                old_value,
                new_value: None,
            });
        }
    }

    fn bump_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Aggregate size of resident entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Configured maximum aggregate size
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys from least- to most-recently-used
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    /// Copy of the contents, least- to most-recently-used
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.order
            .values()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|slot| (key.clone(), slot.value.clone()))
            })
            .collect()
    }
}

impl<K, V> fmt::Debug for LruStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("entries", &self.entries.len())
            .field("size", &self.size)
            .field("max_size", &self.max_size)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
