//! Blobcache - An embeddable two-tier byte-blob cache
//!
//! Caches immutable byte values under string keys in a bounded memory tier
//! backed by a content-addressed disk tier, with size- and age-based disk
//! eviction. All cache state is owned by a single worker per instance, so
//! operations observe a strict total order without explicit locking.

pub mod cache;
pub mod config;
pub mod digest;
pub mod disk;
pub mod error;
pub mod memory;
pub mod tasks;

pub use cache::{
    BlobCache, CacheCounters, DiskEvictionHook, Lookup, MemoryEvictionHook, WeakBlobCache,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use memory::Blob;
pub use tasks::spawn_trim_task;
