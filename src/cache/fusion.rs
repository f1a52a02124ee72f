//! Fusion Cache - Unified Two-Tier Cache
//!
//! Routes reads and writes between the memory tier and the disk tier:
//! values evicted from memory are demoted to disk, disk hits are promoted
//! back into memory.
//!
//! # Concurrency
//!
//! One coordinator-wide mutex is held for the whole of `put`, `get`, `remove`,
//! `clear` and `save_all_to_disk`, so evict-then-demote is atomic with respect
//! to other coordinator calls. A disk write therefore blocks concurrent memory
//! hits too.

use std::path::PathBuf;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::disk::DiskCache;
use super::entry::{CacheValue, ValueKind};
use super::lru::Evicted;
use super::memory::{MemoryCache, MemorySizing};
use super::metrics::{FusionMetrics, MetricsSnapshot};
use super::{DEFAULT_DISK_DIR_NAME, DEFAULT_MEMORY_BUDGET};
use crate::error::{Error, Result};

/// Fusion cache configuration
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Memory budget (bytes, or entries with `MemorySizing::Entries`); 0 disables the tier
    pub memory_budget: u64,
    /// Disk budget in bytes; 0 disables the tier
    pub disk_budget: u64,
    /// Root directory the disk tier lives under
    pub cache_dir: Option<PathBuf>,
    /// Subdirectory of `cache_dir` for cache files
    pub disk_dir_name: Option<String>,
    /// How memory entries are measured
    pub memory_sizing: MemorySizing,
    /// Enable combined put/get; when off only the tiers can be used directly
    pub fusion_enabled: bool,
    /// Log every promotion, demotion and drop at info level
    pub log_tier_moves: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            disk_budget: 0,
            cache_dir: None,
            disk_dir_name: None,
            memory_sizing: MemorySizing::Bytes,
            fusion_enabled: true,
            log_tier_moves: false,
        }
    }
}

impl FusionConfig {
    /// Memory and disk budgets with the disk tier under `cache_dir`
    pub fn new(memory_budget: u64, disk_budget: u64, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            memory_budget,
            disk_budget,
            cache_dir: Some(cache_dir.into()),
            ..Default::default()
        }
    }

    /// Directory the disk tier writes to
    pub fn disk_dir(&self) -> Option<PathBuf> {
        let name = self.disk_dir_name.as_deref().unwrap_or(DEFAULT_DISK_DIR_NAME);
        self.cache_dir.as_ref().map(|root| root.join(name))
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.disk_budget > 0 && self.cache_dir.is_none() {
            return Err(Error::Config(
                "disk budget is set but no cache directory was given".to_string(),
            ));
        }
        if let Some(name) = &self.disk_dir_name {
            let separator = name.contains('/') || name.contains('\\');
            if name.is_empty() || separator || name == "." || name == ".." {
                return Err(Error::Config(format!(
                    "disk directory name must be a single path component: {:?}",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Where a `put` left the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Memory,
    Disk,
    /// Too large for every enabled tier
    Dropped,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Memory => write!(f, "memory"),
            Placement::Disk => write!(f, "disk"),
            Placement::Dropped => write!(f, "dropped"),
        }
    }
}

/// Sizes and counters for both tiers
#[derive(Debug, Clone, Serialize)]
pub struct FusionStats {
    pub memory_size: u64,
    pub memory_max_size: u64,
    pub memory_entries: usize,
    pub disk_size: u64,
    pub disk_max_size: u64,
    pub disk_entries: usize,
    pub metrics: MetricsSnapshot,
}

/// Two-tier cache coordinator
pub struct FusionCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
    config: FusionConfig,
    metrics: FusionMetrics,
    lock: Mutex<()>,
}

impl FusionCache {
    /// Build both tiers from `config`. A zero budget leaves that tier out.
    pub fn new(config: FusionConfig) -> Result<Self> {
        config.validate()?;

        let memory = (config.memory_budget > 0)
            .then(|| MemoryCache::with_sizing(config.memory_budget, config.memory_sizing));

        let disk = match config.disk_dir() {
            Some(dir) if config.disk_budget > 0 => Some(DiskCache::open(dir, config.disk_budget)?),
            _ => None,
        };

        info!(
            memory_budget = config.memory_budget,
            disk_budget = config.disk_budget,
            fusion_enabled = config.fusion_enabled,
            "Fusion cache ready"
        );

        Ok(Self {
            memory,
            disk,
            config,
            metrics: FusionMetrics::new(),
            lock: Mutex::new(()),
        })
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.config.fusion_enabled {
            Ok(())
        } else {
            Err(Error::FusionModeDisabled)
        }
    }

    /// Put a value, preferring memory and demoting whatever memory evicts.
    ///
    /// Values too large for memory go straight to disk. A value that fits no
    /// tier is dropped and reported as `Placement::Dropped`.
    pub fn put(&self, key: &str, value: impl Into<CacheValue>) -> Result<Placement> {
        self.ensure_enabled()?;
        let _guard = self.lock.lock();
        let value = value.into();

        if let Some(memory) = self.memory.as_ref().filter(|memory| memory.fits(&value)) {
            let evicted = memory.put_with_evictions(key, value).unwrap_or_default();
            // Memory copy is now the authoritative one
            if let Some(disk) = self.disk.as_ref().filter(|disk| disk.contains(key)) {
                disk.remove(key);
            }
            self.demote(evicted);
            return Ok(Placement::Memory);
        }

        if let Some(memory) = &self.memory {
            memory.remove(key);
        }

        if let Some(disk) = &self.disk {
            if disk.put(key, &value.encode()) {
                return Ok(Placement::Disk);
            }
            // The replaced value must not be served from disk either
            disk.remove(key);
        }

        self.metrics.record_dropped();
        warn!(key = %key, size = value.size_estimate(), "Value fits no cache tier, dropped");
        Ok(Placement::Dropped)
    }

    /// Move entries evicted from memory onto disk
    fn demote(&self, evicted: Vec<Evicted<String, CacheValue>>) {
        let Some(disk) = &self.disk else {
            for entry in &evicted {
                debug!(key = %entry.key, "Evicted from memory");
            }
            return;
        };

        for Evicted { key, value } in evicted {
            if disk.put(&key, &value.encode()) {
                self.metrics.record_demotion();
                self.log_move("Demoted to disk", &key);
            } else {
                self.metrics.record_dropped();
                warn!(key = %key, "Evicted value too large for disk tier, dropped");
            }
        }
    }

    /// Get a value of the given kind, checking memory then disk.
    ///
    /// A disk hit is promoted into memory; promotion is best-effort. A payload
    /// that cannot be decoded as `kind` counts as a miss.
    pub fn get(&self, key: &str, kind: ValueKind) -> Result<Option<CacheValue>> {
        self.ensure_enabled()?;
        let _guard = self.lock.lock();

        if let Some(value) = self.memory.as_ref().and_then(|memory| memory.get(key, kind)) {
            self.metrics.record_memory_hit();
            return Ok(Some(value));
        }
        self.metrics.record_memory_miss();

        let Some(data) = self.disk.as_ref().and_then(|disk| disk.get(key)) else {
            self.metrics.record_disk_miss();
            return Ok(None);
        };

        let value = match CacheValue::decode(kind, data) {
            Ok(value) => value,
            Err(e) => {
                debug!(key = %key, "Treating undecodable disk entry as a miss: {}", e);
                self.metrics.record_disk_miss();
                return Ok(None);
            }
        };

        self.metrics.record_disk_hit();
        self.promote(key, &value);
        Ok(Some(value))
    }

    /// Copy a disk hit into memory unless memory already holds the key
    /// under another kind.
    fn promote(&self, key: &str, value: &CacheValue) {
        let Some(memory) = self.memory.as_ref().filter(|memory| memory.fits(value)) else {
            return;
        };
        if memory.contains(key) {
            return;
        }
        if let Some(evicted) = memory.put_with_evictions(key, value.clone()) {
            self.metrics.record_promotion();
            self.log_move("Promoted to memory", key);
            self.demote(evicted);
        }
    }

    fn log_move(&self, action: &str, key: &str) {
        if self.config.log_tier_moves {
            info!(key = %key, "{}", action);
        } else {
            debug!(key = %key, "{}", action);
        }
    }

    pub fn get_bytes(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(match self.get(key, ValueKind::Bytes)? {
            Some(CacheValue::Bytes(data)) => Some(data),
            _ => None,
        })
    }

    pub fn get_text(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.get(key, ValueKind::Text)? {
            Some(CacheValue::Text(text)) => Some(text),
            _ => None,
        })
    }

    pub fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(match self.get(key, ValueKind::Json)? {
            Some(CacheValue::Json(doc)) => Some(doc),
            _ => None,
        })
    }

    /// Remove `key` from both tiers, returning the memory copy if there was one
    pub fn remove(&self, key: &str) -> Option<CacheValue> {
        let _guard = self.lock.lock();
        let removed = self.memory.as_ref().and_then(|memory| memory.remove(key));
        if let Some(disk) = &self.disk {
            disk.remove(key);
        }
        removed
    }

    /// Clear both tiers
    pub fn clear(&self) {
        let _guard = self.lock.lock();
        if let Some(memory) = &self.memory {
            memory.clear();
        }
        if let Some(disk) = &self.disk {
            disk.clear();
        }
    }

    /// Copy every memory entry to disk without evicting it from memory.
    ///
    /// Call before shutdown so memory-resident values survive a restart.
    /// Returns the number of entries written.
    pub fn save_all_to_disk(&self) -> usize {
        let _guard = self.lock.lock();
        let (Some(memory), Some(disk)) = (&self.memory, &self.disk) else {
            return 0;
        };

        let mut saved = 0;
        for (key, value) in memory.snapshot() {
            if disk.put(&key, &value.encode()) {
                saved += 1;
            } else {
                warn!(key = %key, "Could not save entry to disk");
            }
        }
        info!(saved, "Saved memory tier to disk");
        saved
    }

    /// Combined size of both tiers
    pub fn size(&self) -> u64 {
        self.memory.as_ref().map_or(0, MemoryCache::size)
            + self.disk.as_ref().map_or(0, DiskCache::size)
    }

    /// Combined budget of both tiers
    pub fn max_size(&self) -> u64 {
        self.memory.as_ref().map_or(0, MemoryCache::max_size)
            + self.disk.as_ref().map_or(0, DiskCache::max_size)
    }

    /// Memory tier, if enabled
    pub fn memory(&self) -> Option<&MemoryCache> {
        self.memory.as_ref()
    }

    /// Disk tier, if enabled
    pub fn disk(&self) -> Option<&DiskCache> {
        self.disk.as_ref()
    }

    pub fn is_fusion_enabled(&self) -> bool {
        self.config.fusion_enabled
    }

    /// Get configuration
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Sizes of both tiers plus metrics
    pub fn stats(&self) -> FusionStats {
        FusionStats {
            memory_size: self.memory.as_ref().map_or(0, MemoryCache::size),
            memory_max_size: self.memory.as_ref().map_or(0, MemoryCache::max_size),
            memory_entries: self.memory.as_ref().map_or(0, MemoryCache::len),
            disk_size: self.disk.as_ref().map_or(0, DiskCache::size),
            disk_max_size: self.disk.as_ref().map_or(0, DiskCache::max_size),
            disk_entries: self.disk.as_ref().map_or(0, DiskCache::len),
            metrics: self.metrics.snapshot(),
        }
    }
}

impl std::fmt::Debug for FusionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionCache")
            .field("memory", &self.memory)
            .field("disk", &self.disk)
            .field("fusion_enabled", &self.config.fusion_enabled)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
