//! Memory Tier - RAM-based Hot Cache
//!
//! Typed values kept live in process memory, bounded by an LRU store.
//!
//! # Design
//!
//! - One `parking_lot::Mutex` around the store; every call holds it for its
//!   full duration
//! - Entries are sized in bytes (`CacheValue::size_estimate`) or counted
//!   (`MemorySizing::Entries`)
//! - Oversized values are skipped rather than reported

use parking_lot::Mutex;
use tracing::debug;

use super::entry::{CacheValue, ValueKind};
use super::lru::{Evicted, LruStore};

/// How memory entries are measured against the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemorySizing {
    /// Estimated byte footprint of each value
    #[default]
    Bytes,
    /// Every entry counts as 1
    Entries,
}

impl MemorySizing {
    /// Size of `value` under this policy
    pub fn size_of(&self, value: &CacheValue) -> u64 {
        match self {
            MemorySizing::Bytes => value.size_estimate(),
            MemorySizing::Entries => 1,
        }
    }
}

/// Memory tier
pub struct MemoryCache {
    store: Mutex<LruStore<String, CacheValue>>,
    sizing: MemorySizing,
}

impl MemoryCache {
    /// Create a memory tier with byte sizing
    pub fn new(max_size: u64) -> Self {
        Self::with_sizing(max_size, MemorySizing::Bytes)
    }

    /// Create a memory tier with an explicit sizing policy
    pub fn with_sizing(max_size: u64, sizing: MemorySizing) -> Self {
        let store = LruStore::with_sizer(max_size, move |_: &String, value: &CacheValue| {
            sizing.size_of(value)
        });
        Self {
            store: Mutex::new(store),
            sizing,
        }
    }

    /// Size `value` would occupy in this tier
    pub fn size_of(&self, value: &CacheValue) -> u64 {
        self.sizing.size_of(value)
    }

    /// Whether `value` can fit at all
    pub fn fits(&self, value: &CacheValue) -> bool {
        self.size_of(value) <= self.max_size()
    }

    /// Store a value. Returns false (and stores nothing) if it can never fit.
    pub fn put(&self, key: impl Into<String>, value: CacheValue) -> bool {
        let key = key.into();
        let mut store = self.store.lock();
        match store.put(key, value) {
            Ok(_) => true,
            Err(e) => {
                debug!("Skipping memory put: {}", e);
                false
            }
        }
    }

    /// Store a value and hand back everything it pushed out, LRU first.
    ///
    /// Returns `None` when the value was too large to store.
    pub(crate) fn put_with_evictions(
        &self,
        key: impl Into<String>,
        value: CacheValue,
    ) -> Option<Vec<Evicted<String, CacheValue>>> {
        let key = key.into();
        let mut store = self.store.lock();
        match store.put_with_evictions(key, value) {
            Ok(outcome) => Some(outcome.evicted),
            Err(e) => {
                debug!("Skipping memory put: {}", e);
                None
            }
        }
    }

    /// Get a value of the expected kind. A value of another kind counts as absent.
    pub fn get(&self, key: &str, kind: ValueKind) -> Option<CacheValue> {
        let mut store = self.store.lock();
        // Only a matching kind counts as a hit and touches recency
        if store.peek(key)?.kind() != kind {
            return None;
        }
        store.get(key).cloned()
    }

    pub fn get_bytes(&self, key: &str) -> Option<bytes::Bytes> {
        match self.get(key, ValueKind::Bytes)? {
            CacheValue::Bytes(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.get(key, ValueKind::Text)? {
            CacheValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        match self.get(key, ValueKind::Json)? {
            CacheValue::Json(doc) => Some(doc),
            _ => None,
        }
    }

    /// Check if a key is resident (does not touch recency)
    pub fn contains(&self, key: &str) -> bool {
        self.store.lock().contains_key(key)
    }

    /// Remove an entry from the cache
    pub fn remove(&self, key: &str) -> Option<CacheValue> {
        self.store.lock().remove(key)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.store.lock().evict_all();
    }

    /// Get current size
    pub fn size(&self) -> u64 {
        self.store.lock().size()
    }

    /// Get configured maximum size
    pub fn max_size(&self) -> u64 {
        self.store.lock().max_size()
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Copy of the contents, least- to most-recently-used
    pub fn snapshot(&self) -> Vec<(String, CacheValue)> {
        self.store.lock().snapshot()
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("store", &*self.store.lock())
            .field("sizing", &self.sizing)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_put_get() {
        let cache = MemoryCache::new(1024);
        assert!(cache.put("greeting", CacheValue::from("Hello, World!")));
        assert_eq!(cache.size(), 13);
        assert_eq!(cache.get_text("greeting").as_deref(), Some("Hello, World!"));
    }

    #[test]
    fn test_memory_kind_mismatch_is_absent() {
        let cache = MemoryCache::new(1024);
        cache.put("doc", CacheValue::from(json!({"a": 1})));

        assert!(cache.get_text("doc").is_none());
        assert!(cache.get_bytes("doc").is_none());
        assert_eq!(cache.get_json("doc"), Some(json!({"a": 1})));
    }

    #[test]
    fn test_memory_kind_mismatch_keeps_recency() {
        let cache = MemoryCache::with_sizing(2, MemorySizing::Entries);
        cache.put("a", CacheValue::from("1"));
        cache.put("b", CacheValue::from("2"));

        assert!(cache.get("a", ValueKind::Json).is_none());
        cache.put("c", CacheValue::from("3"));

        let resident: Vec<String> = cache.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(resident, vec!["b", "c"]);
    }

    #[test]
    fn test_memory_oversized_is_silent_noop() {
        let cache = MemoryCache::new(10);
        cache.put("small", CacheValue::from("abc"));

        assert!(!cache.put("big", CacheValue::from(vec![0u8; 11])));
        assert!(!cache.contains("big"));
        assert_eq!(cache.size(), 3);
    }

    #[test]
    fn test_memory_put_with_evictions() {
        let cache = MemoryCache::with_sizing(2, MemorySizing::Entries);
        cache.put("a", CacheValue::from("1"));
        cache.put("b", CacheValue::from("2"));

        let evicted = cache.put_with_evictions("c", CacheValue::from("3")).unwrap();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].key, "a");
        assert_eq!(evicted[0].value, CacheValue::from("1"));
        assert!(!cache.contains("a"));
    }

    #[test]
    fn test_memory_remove_and_clear() {
        let cache = MemoryCache::new(1024);
        cache.put("a", CacheValue::from("data"));
        cache.put("b", CacheValue::from("more"));

        assert_eq!(cache.remove("a"), Some(CacheValue::from("data")));
        assert!(cache.remove("a").is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_memory_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(MemoryCache::with_sizing(500, MemorySizing::Entries));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("obj-{}-{}", t, i);
                        cache.put(key.clone(), CacheValue::from(vec![i as u8; 8]));
                        cache.get(&key, ValueKind::Bytes);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 500);
        assert!(cache.size() <= cache.max_size());
    }
}
