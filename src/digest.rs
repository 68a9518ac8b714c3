//! Key Digest Module
//!
//! Maps a logical cache key to the fixed-length filename used by the disk
//! tier. The digest is one-way: the key is not recoverable from the file.

use sha1::{Digest, Sha1};

// == Key Digest ==
/// Returns the lowercase hex SHA-1 digest of a key.
///
/// Deterministic, 40 characters, filesystem-safe regardless of what the
/// key itself contains. Collisions are treated as negligible.
pub fn key_digest(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}
