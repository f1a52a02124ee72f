//! Disk Tier Journal
//!
//! Newline-separated list of hashed keys believed live, least-recently-used
//! first. The file is rewritten in full after every mutating disk call, via a
//! temporary sibling and a rename so a torn write never replaces a good journal.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::hash::is_hashed_key;

/// Journal file name inside the cache directory
pub const JOURNAL_FILE_NAME: &str = ".journal";

const JOURNAL_TMP_NAME: &str = ".journal.tmp";

/// Handle to the journal file of one cache directory
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl Journal {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(JOURNAL_FILE_NAME),
            tmp_path: cache_dir.join(JOURNAL_TMP_NAME),
        }
    }

    /// Path of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the hashed keys recorded in the journal.
    ///
    /// A missing journal is a fresh cache and yields no keys. Lines that are
    /// not hashed keys are skipped.
    pub fn load(&self) -> io::Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| {
                let valid = is_hashed_key(line);
                if !valid && !line.is_empty() {
                    tracing::warn!(line = %line, "Ignoring malformed journal line");
                }
                valid
            })
            .map(str::to_string)
            .collect())
    }

    /// Replace the journal with `keys`
    pub fn save<'a, I>(&self, keys: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut buf = Vec::new();
        for key in keys {
            buf.extend_from_slice(key.as_bytes());
            buf.push(b'\n');
        }

        let mut file = fs::File::create(&self.tmp_path)?;
        file.write_all(&buf)?;
        file.flush()?;
        drop(file);
        fs::rename(&self.tmp_path, &self.path)
    }
}

// =============================================================================
// Tests
// =============================================================================
