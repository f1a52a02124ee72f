//! Cache Value Types
//!
//! Closed set of payload kinds the cache can hold. The memory tier keeps the
//! typed value; the disk tier only ever sees the encoded bytes.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of a cached value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Opaque binary blob
    Bytes,
    /// UTF-8 text
    Text,
    /// Structured JSON document
    Json,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bytes => write!(f, "bytes"),
            ValueKind::Text => write!(f, "text"),
            ValueKind::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bytes" => Ok(ValueKind::Bytes),
            "text" => Ok(ValueKind::Text),
            "json" => Ok(ValueKind::Json),
            other => Err(Error::Config(format!("unknown value kind: {}", other))),
        }
    }
}

/// A cached value
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Bytes(Bytes),
    Text(String),
    Json(serde_json::Value),
}

impl CacheValue {
    /// Kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            CacheValue::Bytes(_) => ValueKind::Bytes,
            CacheValue::Text(_) => ValueKind::Text,
            CacheValue::Json(_) => ValueKind::Json,
        }
    }

    /// Estimated in-memory footprint in bytes.
    ///
    /// Raw length for blobs and text, serialized length for documents.
    pub fn size_estimate(&self) -> u64 {
        match self {
            CacheValue::Bytes(data) => data.len() as u64,
            CacheValue::Text(text) => text.len() as u64,
            CacheValue::Json(doc) => serde_json::to_vec(doc)
                .map(|encoded| encoded.len() as u64)
                .unwrap_or(0),
        }
    }

    /// Encode to the byte form stored on disk
    pub fn encode(&self) -> Bytes {
        match self {
            CacheValue::Bytes(data) => data.clone(),
            CacheValue::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            CacheValue::Json(doc) => serde_json::to_vec(doc)
                .map(Bytes::from)
                .unwrap_or_default(),
        }
    }

    /// Decode bytes read from disk as the requested kind
    pub fn decode(kind: ValueKind, data: Bytes) -> Result<Self> {
        match kind {
            ValueKind::Bytes => Ok(CacheValue::Bytes(data)),
            ValueKind::Text => String::from_utf8(data.to_vec())
                .map(CacheValue::Text)
                .map_err(|e| Error::Decode {
                    kind,
                    reason: e.to_string(),
                }),
            ValueKind::Json => serde_json::from_slice(&data)
                .map(CacheValue::Json)
                .map_err(|e| Error::Decode {
                    kind,
                    reason: e.to_string(),
                }),
        }
    }
}

impl From<Bytes> for CacheValue {
    fn from(data: Bytes) -> Self {
        CacheValue::Bytes(data)
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(data: Vec<u8>) -> Self {
        CacheValue::Bytes(Bytes::from(data))
    }
}

impl From<String> for CacheValue {
    fn from(text: String) -> Self {
        CacheValue::Text(text)
    }
}

impl From<&str> for CacheValue {
    fn from(text: &str) -> Self {
        CacheValue::Text(text.to_string())
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(doc: serde_json::Value) -> Self {
        CacheValue::Json(doc)
    }
}

// =============================================================================
// Tests
// =============================================================================
