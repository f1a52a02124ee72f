//! Error types for FusionCache

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::ValueKind;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in FusionCache
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single value is larger than the whole store
    #[error("value exceeds capacity: size {size} > max size {max_size}")]
    CapacityExceeded { size: u64, max_size: u64 },

    /// Cache path exists but is a regular file
    #[error("Cache path is not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    /// Cache directory could not be created
    #[error("Cannot create cache directory {}: {source}", .path.display())]
    CacheDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Combined put/get called while fusion mode is off
    #[error("Fusion mode is not enabled; use the memory and disk tiers directly")]
    FusionModeDisabled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored payload cannot be read back as the requested kind
    #[error("Cannot decode payload as {kind}: {reason}")]
    Decode { kind: ValueKind, reason: String },
}
