//! FusionCache - Two-Tier Key/Value Cache
//!
//! A bounded in-memory LRU tier backed by a bounded on-disk tier. Values
//! evicted from memory survive on disk, values found on disk are promoted
//! back into memory, and the disk tier rebuilds its index from a journal
//! after a restart.
//!
//! # Architecture
//!
//! ```text
//! put ──▶ Fusion Cache ──▶ Memory Tier ──(evicted)──▶ Disk Tier
//! get ──▶ Fusion Cache ──▶ Memory Tier ──(miss)─────▶ Disk Tier ──(hit)──▶ promote
//! ```
//!
//! # Modules
//!
//! - [`cache`] - LRU store, memory tier, disk tier and the fusion coordinator
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```no_run
//! use fusioncache::{FusionCache, FusionConfig};
//!
//! let config = FusionConfig::new(1024 * 1024, 64 * 1024 * 1024, "/tmp/app-cache");
//! let cache = FusionCache::new(config)?;
//! cache.put("greeting", "hello")?;
//! assert_eq!(cache.get_text("greeting")?.as_deref(), Some("hello"));
//! cache.save_all_to_disk();
//! # Ok::<(), fusioncache::Error>(())
//! ```

pub mod cache;
pub mod error;

// Re-export commonly used types
pub use cache::{
    CacheValue, DiskCache, FusionCache, FusionConfig, MemoryCache, MemorySizing, Placement,
    ValueKind,
};
pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
