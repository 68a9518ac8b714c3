//! Cache Module
//!
//! The cache engine: a single-worker serializer owning the memory index,
//! reverse identity map, disk store, and counters, fronted by the
//! `BlobCache` handle.

mod blob_cache;
mod counters;
mod serializer;
mod state;


// Re-export public types
pub use blob_cache::{BlobCache, WeakBlobCache, CACHE_NAMESPACE};
pub use counters::CacheCounters;
pub use serializer::{Serializer, WeakSerializer};
pub use state::{DiskEvictionHook, Lookup, MemoryEvictionHook};
