//! Two-Tier Fusion Cache
//!
//! Bounded in-memory tier backed by a bounded on-disk tier.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                          Fusion Cache                                     │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │  Memory Tier (RAM)                  │  Disk Tier (files)                  │
//! │  ┌──────────────────────────────┐   │  ┌──────────────────────────────┐   │
//! │  │ LruStore<String, CacheValue> │   │  │ LruStore<hashed key, length> │   │
//! │  │ sized in bytes or entries    │   │  │ + one file per hashed key    │   │
//! │  └──────────────────────────────┘   │  │ + .journal for restarts      │   │
//! │              │                      │  └──────────────────────────────┘   │
//! │              └──────── demote on evict ──────▶ │                          │
//! │              ◀──────── promote on hit ─────────┘                          │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Write path
//!
//! Values that fit the memory budget go to memory; whatever memory evicts is
//! written to disk. Values too large for memory go straight to disk.
//!
//! # Read path
//!
//! Memory first, then disk. A disk hit is copied back into memory.

mod disk;
mod entry;
mod fusion;
mod hash;
mod journal;
mod lru;
mod memory;
mod metrics;
mod proptest;

pub use disk::DiskCache;
pub use entry::{CacheValue, ValueKind};
pub use fusion::{FusionCache, FusionConfig, FusionStats, Placement};
pub use hash::{hash_key, HASHED_KEY_LEN};
pub use journal::JOURNAL_FILE_NAME;
pub use lru::{Evicted, LruStore, PutOutcome, Removal, RemovalCause};
pub use memory::{MemoryCache, MemorySizing};
pub use metrics::{FusionMetrics, MetricsSnapshot};

/// Default memory budget (16MB)
pub const DEFAULT_MEMORY_BUDGET: u64 = 16 * 1024 * 1024;

/// Default disk budget used by the CLI (256MB)
pub const DEFAULT_DISK_BUDGET: u64 = 256 * 1024 * 1024;

/// Default subdirectory for disk tier files
pub const DEFAULT_DISK_DIR_NAME: &str = "fusion_cache";

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        // Memory: 16MB
        assert_eq!(DEFAULT_MEMORY_BUDGET, 16 * 1024 * 1024);
        // Disk: 256MB
        assert_eq!(DEFAULT_DISK_BUDGET, 256 * 1024 * 1024);
        assert!(DEFAULT_MEMORY_BUDGET < DEFAULT_DISK_BUDGET);
    }

    #[test]
    fn test_journal_name_never_collides_with_hashed_keys() {
        assert!(JOURNAL_FILE_NAME.starts_with('.'));
        assert_ne!(JOURNAL_FILE_NAME.len(), HASHED_KEY_LEN);
    }
}
