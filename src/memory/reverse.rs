//! Reverse Identity Map Module
//!
//! Maps the identity of a resident blob back to its logical key. The
//! memory index reports evictions by value only; this side table is how
//! the cache recovers the key for hook invocation and counter bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use crate::memory::Blob;

// == Blob Identity ==
/// Returns the identity of a blob: the address of its shared allocation.
///
/// Clones of the same blob share an identity; equal bytes in distinct
/// allocations do not.
pub fn blob_identity(blob: &Blob) -> usize {
    Arc::as_ptr(blob) as *const u8 as usize
}

// == Reverse Map ==
/// Identity-keyed side table of blob identity to cache key.
///
/// Invariant: one entry per blob currently resident in the memory index,
/// created when the blob is inserted and removed when the index reports
/// its eviction or the cache removes the entry itself.
#[derive(Debug, Default)]
pub struct ReverseMap {
    entries: HashMap<usize, String>,
}

impl ReverseMap {
    /// Creates an empty reverse map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the blob with `identity` is stored under `key`.
    pub fn associate(&mut self, identity: usize, key: &str) {
        self.entries.insert(identity, key.to_string());
    }

    /// Removes and returns the key for `identity`, if known.
    pub fn lookup_and_remove(&mut self, identity: usize) -> Option<String> {
        self.entries.remove(&identity)
    }

    /// Drops all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no identities are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn blob(bytes: &[u8]) -> Blob {
        bytes.to_vec().into()
    }

    #[test]
    fn test_reverse_associate_and_lookup() {
        let mut map = ReverseMap::new();
        let b = blob(b"payload");

        map.associate(blob_identity(&b), "key1");

        assert_eq!(map.lookup_and_remove(blob_identity(&b)), Some("key1".to_string()));
        // Entry is consumed by the lookup
        assert_eq!(map.lookup_and_remove(blob_identity(&b)), None);
    }

    #[test]
    fn test_reverse_clones_share_identity() {
        let b = blob(b"shared");
        let clone = b.clone();

        assert_eq!(blob_identity(&b), blob_identity(&clone));
    }

    #[test]
    fn test_reverse_equal_bytes_distinct_allocations() {
        let first = blob(b"same");
        let second = blob(b"same");

        assert_ne!(blob_identity(&first), blob_identity(&second));

        let mut map = ReverseMap::new();
        map.associate(blob_identity(&first), "first");
        map.associate(blob_identity(&second), "second");

        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup_and_remove(blob_identity(&second)), Some("second".to_string()));
        assert_eq!(map.lookup_and_remove(blob_identity(&first)), Some("first".to_string()));
    }

    #[test]
    fn test_reverse_clear() {
        let mut map = ReverseMap::new();
        let b = blob(b"x");
        map.associate(blob_identity(&b), "key");

        map.clear();

        assert!(map.is_empty());
        assert_eq!(map.lookup_and_remove(blob_identity(&b)), None);
    }
}
