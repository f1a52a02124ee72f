//! Hashed Keys
//!
//! Logical keys are mapped to fixed-width, filesystem-safe names: the MD5
//! digest of the key rendered as 32 lowercase hex characters. Distinct keys
//! that collide share one file; collisions are not detected.

use std::fmt::Write;

use md5::{Digest, Md5};

/// Length of a hashed key in characters
pub const HASHED_KEY_LEN: usize = 32;

/// Hash a logical key into its on-disk name
pub fn hash_key(key: &str) -> String {
    let digest = Md5::digest(key.as_bytes());
    let mut hashed = String::with_capacity(HASHED_KEY_LEN);
    for byte in digest.iter() {
        let _ = write!(hashed, "{:02x}", byte);
    }
    hashed
}

/// Whether `name` has the shape of a hashed key
pub fn is_hashed_key(name: &str) -> bool {
    name.len() == HASHED_KEY_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
