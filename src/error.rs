//! Error types for the blob cache
//!
//! Provides unified error handling using thiserror.
//!
//! Filesystem failures are deliberately absent from this enum: the disk
//! tier swallows them into the log and degrades to a cache miss, so they
//! never surface to callers. The errors here cover the lifecycle of the
//! cache instance itself.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the blob cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No usable cache root directory could be determined
    #[error("Cache root unavailable: {0}")]
    CacheRoot(String),

    /// The worker thread backing this instance could not be spawned
    #[error("Failed to spawn cache worker: {0}")]
    WorkerSpawn(String),

    /// The cache instance has been dropped and its worker has shut down
    #[error("Cache worker has shut down")]
    Closed,

    /// A blocking submission was issued from the cache worker itself,
    /// which would deadlock the queue
    #[error("Re-entrant blocking submission from the cache worker")]
    ReentrantWait,
}

// == Result Type Alias ==
/// Convenience Result type for the blob cache.
pub type Result<T> = std::result::Result<T, CacheError>;
