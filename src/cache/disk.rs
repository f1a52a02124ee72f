//! Disk Tier - File-backed Warm Cache
//!
//! One file per live entry, named by the hashed key, holding the raw payload
//! with no framing. An LRU store of `(hashed key, byte length)` does the size
//! accounting; evicting from it deletes the file.
//!
//! # Design
//!
//! - All public calls hold one `parking_lot::Mutex` for their full duration,
//!   disk I/O included
//! - The journal is rewritten after every put/get/remove and replayed on open
//! - I/O failures are logged and absorbed; the index is not rolled back

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::hash::hash_key;
use super::journal::Journal;
use super::lru::{LruStore, Removal};
use crate::error::{Error, Result};

/// Disk tier
pub struct DiskCache {
    /// hashed key -> file length
    store: Mutex<LruStore<String, u64>>,
    dir: PathBuf,
    journal: Journal,
}

impl DiskCache {
    /// Open (or create) a disk tier rooted at `dir`, replaying its journal.
    ///
    /// Fails if `dir` exists but is not a directory, or cannot be created.
    pub fn open(dir: impl Into<PathBuf>, max_size: u64) -> Result<Self> {
        let dir = dir.into();
        prepare_dir(&dir)?;

        let evict_dir = dir.clone();
        let store = LruStore::with_sizer(max_size, |_: &String, size: &u64| *size).on_removed(
            move |removal: Removal<'_, String, u64>| {
                if removal.evicted() {
                    debug!(key = %removal.key, size = *removal.old_value, "Evicting disk entry");
                    remove_file_quietly(&evict_dir.join(removal.key));
                }
            },
        );

        let cache = Self {
            store: Mutex::new(store),
            journal: Journal::new(&dir),
            dir,
        };
        cache.restore();
        Ok(cache)
    }

    /// Rebuild the size index from the journal.
    ///
    /// Entries whose file is gone are dropped; entries larger than the current
    /// max size are dropped and their file deleted. If the survivors still do
    /// not fit, the oldest are evicted like on any other put.
    fn restore(&self) {
        let keys = match self.journal.load() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(path = %self.journal.path().display(), "Failed to read journal: {}", e);
                return;
            }
        };

        let mut store = self.store.lock();
        let max_size = store.max_size();

        for hashed in keys {
            let path = self.dir.join(&hashed);
            let len = match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => continue,
            };

            if len > max_size {
                debug!(key = %hashed, size = len, max_size, "Dropping entry larger than max size");
                remove_file_quietly(&path);
                continue;
            }

            if let Err(e) = store.put(hashed, len) {
                warn!("Failed to restore journal entry: {}", e);
            }
        }

        self.save_journal(&store);
        info!(
            dir = %self.dir.display(),
            entries = store.len(),
            size = store.size(),
            max_size,
            "Disk cache opened"
        );
    }

    /// Store `data` under `key`. Returns false if it was skipped or failed.
    pub fn put(&self, key: &str, data: &[u8]) -> bool {
        let mut store = self.store.lock();

        let size = data.len() as u64;
        if size > store.max_size() {
            debug!(size, max_size = store.max_size(), "Skipping disk put: value exceeds capacity");
            return false;
        }

        let hashed = hash_key(key);
        let path = self.dir.join(&hashed);
        if let Err(e) = fs::write(&path, data) {
            warn!(path = %path.display(), "Failed to write cache file: {}", e);
            return false;
        }

        if let Err(e) = store.put(hashed, size) {
            warn!("Failed to index cache file: {}", e);
            return false;
        }

        self.save_journal(&store);
        true
    }

    /// Read the payload stored under `key`
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut store = self.store.lock();

        let hashed = hash_key(key);
        let path = self.dir.join(&hashed);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), "Failed to read cache file: {}", e);
                return None;
            }
        };

        store.get(&hashed);
        self.save_journal(&store);
        Some(Bytes::from(data))
    }

    /// Remove `key`. Returns true if an index entry or file was removed.
    pub fn remove(&self, key: &str) -> bool {
        let mut store = self.store.lock();

        let hashed = hash_key(key);
        let indexed = store.remove(&hashed).is_some();
        let deleted = remove_file_quietly(&self.dir.join(&hashed));

        self.save_journal(&store);
        indexed || deleted
    }

    /// Delete every file under the cache directory, journal included
    pub fn clear(&self) {
        let mut store = self.store.lock();
        store.evict_all();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), "Failed to list cache directory: {}", e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = result {
                warn!(path = %path.display(), "Failed to delete: {}", e);
            }
        }
    }

    /// Check if `key` is in the size index
    pub fn contains(&self, key: &str) -> bool {
        self.store.lock().contains_key(&hash_key(key))
    }

    /// Get current size in bytes
    pub fn size(&self) -> u64 {
        self.store.lock().size()
    }

    /// Get configured maximum size in bytes
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

    /// Hashed keys and sizes, least- to most-recently-used
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.store.lock().snapshot()
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Journal file path
    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    fn save_journal(&self, store: &LruStore<String, u64>) {
        if let Err(e) = self.journal.save(store.keys()) {
            warn!(path = %self.journal.path().display(), "Failed to write journal: {}", e);
        }
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("dir", &self.dir)
            .field("store", &*self.store.lock())
            .finish()
    }
}

fn prepare_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(Error::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|source| Error::CacheDirCreate {
        path: dir.to_path_buf(),
        source,
    })
}

/// Delete a file, treating "already gone" as success. Returns true if deleted.
fn remove_file_quietly(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), "Failed to delete cache file: {}", e);
            false
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
