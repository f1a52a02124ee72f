//! FusionCache Integration Tests
//!
//! End-to-end scenarios across both tiers:
//! - Disk tier restart recovery from the journal
//! - Memory eviction, demotion and promotion through the coordinator
//! - Disabled fusion mode and construction failures

use std::fs;
use std::sync::Arc;
use std::thread;

use assert_matches::assert_matches;
use bytes::Bytes;
use serde_json::json;
use tempfile::TempDir;

use fusioncache::cache::{hash_key, LruStore, JOURNAL_FILE_NAME};
use fusioncache::{
    CacheValue, DiskCache, Error, FusionCache, FusionConfig, MemorySizing, Placement, ValueKind,
};

// =============================================================================
// Disk Tier Recovery
// =============================================================================

mod disk_recovery_tests {
    use super::*;

    #[test]
    fn test_restart_recovers_size_and_contents() {
        let temp = TempDir::new().unwrap();
        let payloads: Vec<(String, Vec<u8>)> = (0..4)
            .map(|i| (format!("https://example.com/{}", i), vec![i as u8; 20]))
            .collect();

        {
            let disk = DiskCache::open(temp.path(), 100).unwrap();
            for (key, data) in &payloads {
                assert!(disk.put(key, data));
            }
            assert_eq!(disk.size(), 80);
        }

        let disk = DiskCache::open(temp.path(), 100).unwrap();
        assert_eq!(disk.size(), 80);
        for (key, data) in &payloads {
            assert_eq!(disk.get(key).unwrap().as_ref(), data.as_slice());
        }
    }

    #[test]
    fn test_shrinking_max_size_drops_entries() {
        let temp = TempDir::new().unwrap();
        {
            let disk = DiskCache::open(temp.path(), 100).unwrap();
            disk.put("a", &[1u8; 30]);
            disk.put("b", &[2u8; 30]);
            disk.put("c", &[3u8; 30]);
            assert_eq!(disk.size(), 90);
        }

        let disk = DiskCache::open(temp.path(), 50).unwrap();
        assert!(disk.size() <= 50);
        assert_eq!(disk.size(), 30);

        // Oldest entries went first
        assert!(!temp.path().join(hash_key("a")).exists());
        assert!(!temp.path().join(hash_key("b")).exists());
        assert_eq!(disk.get("c").unwrap().as_ref(), &[3u8; 30][..]);
    }

    #[test]
    fn test_entries_larger_than_new_max_are_deleted() {
        let temp = TempDir::new().unwrap();
        {
            let disk = DiskCache::open(temp.path(), 100).unwrap();
            disk.put("big", &[0u8; 80]);
            disk.put("small", &[0u8; 10]);
        }

        let disk = DiskCache::open(temp.path(), 50).unwrap();
        assert_eq!(disk.size(), 10);
        assert!(!temp.path().join(hash_key("big")).exists());
        assert!(disk.get("big").is_none());
    }

    #[test]
    fn test_restart_preserves_recency_order() {
        let temp = TempDir::new().unwrap();
        {
            let disk = DiskCache::open(temp.path(), 100).unwrap();
            disk.put("a", &[0u8; 30]);
            disk.put("b", &[0u8; 30]);
            disk.get("a");
        }

        let disk = DiskCache::open(temp.path(), 100).unwrap();
        disk.put("c", &[0u8; 50]);
        // "b" was least recently used before the restart
        assert!(!disk.contains("b"));
        assert!(disk.contains("a"));
    }

    #[test]
    fn test_corrupt_journal_is_tolerated() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(JOURNAL_FILE_NAME), "garbage\n../../etc/passwd\n").unwrap();

        let disk = DiskCache::open(temp.path(), 100).unwrap();
        assert!(disk.is_empty());
        assert!(disk.put("a", b"ok"));
    }

    #[test]
    fn test_open_fails_on_regular_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file");
        fs::write(&path, b"x").unwrap();

        assert_matches!(DiskCache::open(&path, 100), Err(Error::NotADirectory { .. }));
    }
}

// =============================================================================
// Fusion Coordinator
// =============================================================================

mod fusion_tests {
    use super::*;

    fn entry_counting(temp: &TempDir, entries: u64) -> FusionCache {
        let config = FusionConfig {
            memory_sizing: MemorySizing::Entries,
            ..FusionConfig::new(entries, 1024 * 1024, temp.path())
        };
        FusionCache::new(config).unwrap()
    }

    #[test]
    fn test_eleventh_put_demotes_lru_entry() {
        let temp = TempDir::new().unwrap();
        let cache = entry_counting(&temp, 10);

        for i in 0..10 {
            let placement = cache.put(&format!("key-{}", i), format!("value-{}", i)).unwrap();
            assert_eq!(placement, Placement::Memory);
        }
        // Touch key-0 so key-1 becomes least recently used
        assert!(cache.get_text("key-0").unwrap().is_some());
        cache.put("key-10", "value-10").unwrap();

        let memory = cache.memory().unwrap();
        let resident: Vec<String> = memory.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(resident.len(), 10);
        assert!(!resident.contains(&"key-1".to_string()));
        assert!(cache.disk().unwrap().contains("key-1"));

        assert_eq!(cache.get_text("key-1").unwrap().as_deref(), Some("value-1"));
        assert!(memory.contains("key-1"));
        assert_eq!(cache.metrics().promotions, 1);
    }

    #[test]
    fn test_typed_values_round_trip_through_disk() {
        let temp = TempDir::new().unwrap();
        let cache = entry_counting(&temp, 1);

        cache.put("doc", json!({"tiers": ["memory", "disk"]})).unwrap();
        cache.put("blob", Bytes::from_static(b"\x00\x01\x02")).unwrap();
        cache.put("text", "plain").unwrap();

        // Only "text" is left in memory
        assert_eq!(
            cache.get_json("doc").unwrap(),
            Some(json!({"tiers": ["memory", "disk"]}))
        );
        assert_eq!(
            cache.get_bytes("blob").unwrap(),
            Some(Bytes::from_static(b"\x00\x01\x02"))
        );
        assert_eq!(cache.get_text("text").unwrap().as_deref(), Some("plain"));
    }

    #[test]
    fn test_save_all_survives_restart() {
        let temp = TempDir::new().unwrap();
        {
            let cache = FusionCache::new(FusionConfig::new(4096, 4096, temp.path())).unwrap();
            cache.put("session", json!({"user": 42})).unwrap();
            cache.put("motd", "welcome back").unwrap();
            assert_eq!(cache.save_all_to_disk(), 2);
        }

        let cache = FusionCache::new(FusionConfig::new(4096, 4096, temp.path())).unwrap();
        assert_eq!(cache.get_json("session").unwrap(), Some(json!({"user": 42})));
        assert_eq!(cache.get_text("motd").unwrap().as_deref(), Some("welcome back"));
        assert_eq!(cache.metrics().disk_hits, 2);
    }

    #[test]
    fn test_kind_mismatch_in_memory_falls_through() {
        let temp = TempDir::new().unwrap();
        let cache = FusionCache::new(FusionConfig::new(4096, 4096, temp.path())).unwrap();

        cache.put("k", "text").unwrap();
        assert!(cache.get("k", ValueKind::Json).unwrap().is_none());
        assert_eq!(
            cache.get("k", ValueKind::Text).unwrap(),
            Some(CacheValue::from("text"))
        );
    }

    #[test]
    fn test_disabled_mode_rejects_combined_calls() {
        let temp = TempDir::new().unwrap();
        let config = FusionConfig {
            fusion_enabled: false,
            ..FusionConfig::new(4096, 4096, temp.path())
        };
        let cache = FusionCache::new(config).unwrap();

        assert_matches!(cache.put("k", "v"), Err(Error::FusionModeDisabled));
        assert_matches!(cache.get_text("k"), Err(Error::FusionModeDisabled));
        assert!(!cache.is_fusion_enabled());
    }

    #[test]
    fn test_zero_budgets_disable_tiers() {
        let temp = TempDir::new().unwrap();

        let disk_only = FusionCache::new(FusionConfig::new(0, 4096, temp.path())).unwrap();
        assert!(disk_only.memory().is_none());
        assert_eq!(disk_only.put("k", "v").unwrap(), Placement::Disk);
        assert_eq!(disk_only.get_text("k").unwrap().as_deref(), Some("v"));
        assert_eq!(disk_only.max_size(), 4096);

        let memory_only = FusionCache::new(FusionConfig::new(4096, 0, temp.path())).unwrap();
        assert!(memory_only.disk().is_none());
        assert_eq!(memory_only.save_all_to_disk(), 0);
        assert_eq!(memory_only.max_size(), 4096);
    }

    #[test]
    fn test_concurrent_coordinator_access() {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(entry_counting(&temp, 32));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("t{}-{}", t, i);
                        cache.put(&key, format!("v{}", i)).unwrap();
                        assert_eq!(cache.get_text(&key).unwrap(), Some(format!("v{}", i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let memory = cache.memory().unwrap();
        let disk = cache.disk().unwrap();
        assert_eq!(memory.len(), 32);
        // Promoted entries keep their disk copy
        assert!(disk.len() >= 200 - 32);
        for t in 0..4 {
            for i in 0..50 {
                let key = format!("t{}-{}", t, i);
                assert!(memory.contains(&key) || disk.contains(&key), "lost {}", key);
            }
        }
    }
}

// =============================================================================
// LRU Store
// =============================================================================

mod lru_tests {
    use super::*;

    #[test]
    fn test_oversized_value_leaves_store_untouched() {
        let mut store: LruStore<String, Vec<u8>> =
            LruStore::with_sizer(100, |_, v: &Vec<u8>| v.len() as u64);
        store.put("a".to_string(), vec![0; 60]).unwrap();

        assert_matches!(
            store.put("b".to_string(), vec![0; 200]),
            Err(Error::CapacityExceeded { size: 200, max_size: 100 })
        );
        assert_eq!(store.size(), 60);
        assert_eq!(store.len(), 1);
    }
}
