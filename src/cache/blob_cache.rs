//! Blob Cache Façade
//!
//! The public handle to a cache instance. Every operation is a thin
//! submission onto the instance's serializer: mutations post a job and
//! deliver their result through a completion callback (or an awaitable
//! variant), while configuration accessors block for a consistent
//! snapshot of in-flight mutations.
//!
//! Completion callbacks and eviction hooks run on the cache worker. They
//! may submit further asynchronous work back into the same cache, but
//! must not issue blocking calls against it; those are rejected with
//! `CacheError::ReentrantWait`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use crate::cache::counters::CacheCounters;
use crate::cache::serializer::{Serializer, WeakSerializer};
use crate::cache::state::{CacheState, DiskEvictionHook, Lookup, MemoryEvictionHook};
use crate::config::CacheConfig;
use crate::disk::DiskStore;
use crate::error::{CacheError, Result};
use crate::memory::Blob;

// == Naming ==
/// Directory under the platform cache root that holds every instance.
pub const CACHE_NAMESPACE: &str = "blobcache";

/// Reserved instance name used by the process-wide shared cache.
const SHARED_INSTANCE_NAME: &str = "shared";

// == Blob Cache ==
/// Handle to a two-tier byte-blob cache instance.
///
/// Handles are cheap to clone and share one worker. Dropping the last
/// handle shuts the instance down: jobs already queued still run, and any
/// later submission reports `CacheError::Closed` (surfaced as a silent
/// no-op by the fire-and-forget methods, matching the rule that nothing
/// here is a fatal error).
#[derive(Clone)]
pub struct BlobCache {
    serializer: Serializer<CacheState>,
}

impl BlobCache {
    // == Constructors ==
    /// Opens (or creates) the named instance under the platform cache
    /// root, at `<cache root>/blobcache/<name>/`.
    pub fn new(name: &str, config: CacheConfig) -> Result<Self> {
        let base = dirs::cache_dir()
            .ok_or_else(|| CacheError::CacheRoot("no platform cache directory".to_string()))?;
        Self::with_root(base.join(CACHE_NAMESPACE).join(name), config)
    }

    /// Opens (or creates) an instance rooted at an explicit directory.
    pub fn with_root(root: impl Into<PathBuf>, config: CacheConfig) -> Result<Self> {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache".to_string());
        let state = CacheState::new(DiskStore::new(root), &config);
        Ok(Self {
            serializer: Serializer::spawn(&name, state)?,
        })
    }

    /// Process-wide shared instance, created on first use with default
    /// limits.
    ///
    /// # Panics
    /// Panics if the platform cache root is unavailable; hosts that need
    /// fallible initialization should construct their own instance.
    pub fn shared() -> &'static BlobCache {
        static SHARED: OnceLock<BlobCache> = OnceLock::new();
        SHARED.get_or_init(|| {
            BlobCache::new(SHARED_INSTANCE_NAME, CacheConfig::default())
                .expect("shared cache instance could not be created")
        })
    }

    // == Downgrade ==
    /// Returns a handle that does not keep the instance alive.
    ///
    /// Long-lived observers such as the periodic trim task hold this
    /// form and upgrade it per use, so the instance still shuts down
    /// when its owner drops the last strong handle.
    pub fn downgrade(&self) -> WeakBlobCache {
        WeakBlobCache {
            serializer: self.serializer.downgrade(),
        }
    }

    // == Get ==
    /// Looks up `key`, invoking `completion` with the result.
    ///
    /// A memory miss falls back to disk; a disk hit refreshes the file's
    /// modification time and promotes the value into the memory tier.
    /// An empty key is a silent no-op: the completion is never invoked.
    pub fn get_with<F>(&self, key: impl Into<String>, completion: F)
    where
        F: FnOnce(Lookup) + Send + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        let _ = self.serializer.submit(move |state| completion(state.fetch(&key)));
    }

    /// Awaitable variant of `get_with`.
    pub async fn get(&self, key: impl Into<String>) -> Result<Lookup> {
        let key = key.into();
        if key.is_empty() {
            return Ok(empty_lookup(key));
        }
        let rx = self.serializer.request(move |state| state.fetch(&key))?;
        rx.await.map_err(|_| CacheError::Closed)
    }

    /// Blocking variant of `get_with`, for synchronous hosts and tests.
    /// Must not be called from an async context.
    pub fn get_blocking(&self, key: impl Into<String>) -> Result<Lookup> {
        let key = key.into();
        if key.is_empty() {
            return Ok(empty_lookup(key));
        }
        self.serializer.submit_wait(move |state| state.fetch(&key))
    }

    // == File Location ==
    /// Returns the disk copy's path for `key` if a file exists there,
    /// without touching the memory tier or the modification time.
    pub async fn file_location(&self, key: impl Into<String>) -> Result<Option<PathBuf>> {
        let key = key.into();
        if key.is_empty() {
            return Ok(None);
        }
        let rx = self.serializer.request(move |state| state.file_location(&key))?;
        rx.await.map_err(|_| CacheError::Closed)
    }

    /// Blocking variant of `file_location`.
    pub fn file_location_blocking(&self, key: impl Into<String>) -> Result<Option<PathBuf>> {
        let key = key.into();
        if key.is_empty() {
            return Ok(None);
        }
        self.serializer.submit_wait(move |state| state.file_location(&key))
    }

    // == Set ==
    /// Stores `blob` under `key` in both tiers, invoking `completion`
    /// once the entry is resident. Storing `None` removes the entry, and
    /// an empty key is a silent no-op.
    ///
    /// After the completion has been delivered, still within the same
    /// serialized task, any active disk byte budget or max age is
    /// enforced by the corresponding trim.
    pub fn set_with<F>(&self, key: impl Into<String>, blob: Option<Blob>, completion: F)
    where
        F: FnOnce(Lookup) + Send + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        let _ = self.serializer.submit(move |state| {
            completion(state.store(&key, blob));
            state.trim_after_store();
        });
    }

    /// Awaitable variant of `set_with`.
    pub async fn set(&self, key: impl Into<String>, blob: Option<Blob>) -> Result<Lookup> {
        let key = key.into();
        if key.is_empty() {
            return Ok(empty_lookup(key));
        }
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.serializer.submit(move |state| {
            let _ = reply.send(state.store(&key, blob));
            state.trim_after_store();
        })?;
        rx.await.map_err(|_| CacheError::Closed)
    }

    /// Blocking variant of `set_with`.
    pub fn set_blocking(&self, key: impl Into<String>, blob: Option<Blob>) -> Result<Lookup> {
        let key = key.into();
        if key.is_empty() {
            return Ok(empty_lookup(key));
        }
        self.serializer.submit_wait(move |state| {
            let lookup = state.store(&key, blob);
            state.trim_after_store();
            lookup
        })
    }

    // == Remove ==
    /// Removes `key` from both tiers, invoking `completion` with the path
    /// the disk removal targeted. An empty key is a silent no-op.
    pub fn remove_with<F>(&self, key: impl Into<String>, completion: F)
    where
        F: FnOnce(Lookup) + Send + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        let _ = self.serializer.submit(move |state| completion(state.remove(&key)));
    }

    /// Awaitable variant of `remove_with`.
    pub async fn remove(&self, key: impl Into<String>) -> Result<Lookup> {
        let key = key.into();
        if key.is_empty() {
            return Ok(empty_lookup(key));
        }
        let rx = self.serializer.request(move |state| state.remove(&key))?;
        rx.await.map_err(|_| CacheError::Closed)
    }

    /// Blocking variant of `remove_with`.
    pub fn remove_blocking(&self, key: impl Into<String>) -> Result<Lookup> {
        let key = key.into();
        if key.is_empty() {
            return Ok(empty_lookup(key));
        }
        self.serializer.submit_wait(move |state| state.remove(&key))
    }

    // == Clears ==
    /// Drops every memory entry. Bulk clear: eviction hooks are bypassed.
    pub fn clear_memory(&self) {
        let _ = self.serializer.submit(|state| state.clear_memory());
    }

    /// Deletes the entire disk tier and recreates it empty.
    pub fn clear_disk(&self) {
        let _ = self.serializer.submit(|state| state.clear_disk());
    }

    /// Clears both tiers as one unit and returns once done.
    pub fn clear_all(&self) -> Result<()> {
        self.serializer.submit_wait(|state| {
            state.clear_memory();
            state.clear_disk();
        })
    }

    /// Entry point for a host low-memory notification. Posts an
    /// asynchronous memory clear and returns immediately.
    pub fn handle_low_memory(&self) {
        self.clear_memory();
    }

    // == Disk Trimming ==
    /// Posts a trim of the disk tier to at most `limit` bytes, deleting
    /// oldest files first. A limit of 0 clears the disk tier.
    pub fn trim_disk_to_bytes(&self, limit: u64) {
        let _ = self.serializer.submit(move |state| state.trim_disk_to_bytes(limit));
    }

    /// Posts a trim deleting every disk file not modified since `cutoff`.
    /// The epoch sentinel clears the disk tier.
    pub fn trim_disk_to_date(&self, cutoff: SystemTime) {
        let _ = self.serializer.submit(move |state| state.trim_disk_to_date(cutoff));
    }

    /// Posts an age trim against the configured max age, if one is set.
    /// Reports `Closed` so periodic callers can stop when the cache is
    /// gone.
    pub fn trim_expired(&self) -> Result<()> {
        self.serializer.submit(|state| state.trim_expired())
    }

    // == Limit Accessors ==
    /// Memory tier byte budget (0 = unlimited). Consistent snapshot.
    pub fn memory_byte_limit(&self) -> Result<u64> {
        self.serializer.submit_wait(|state| state.memory_byte_limit())
    }

    /// Memory tier entry limit (0 = unlimited). Consistent snapshot.
    pub fn memory_count_limit(&self) -> Result<usize> {
        self.serializer.submit_wait(|state| state.memory_count_limit())
    }

    /// Disk tier byte budget (0 = unlimited). Consistent snapshot.
    pub fn disk_byte_limit(&self) -> Result<u64> {
        self.serializer.submit_wait(|state| state.disk_byte_limit())
    }

    /// Disk tier max age in seconds (0 = unlimited). Consistent snapshot.
    pub fn disk_max_age_secs(&self) -> Result<u64> {
        self.serializer.submit_wait(|state| state.disk_max_age_secs())
    }

    /// Sets the memory byte budget; lowering it can evict immediately.
    pub fn set_memory_byte_limit(&self, limit: u64) {
        let _ = self.serializer.submit(move |state| state.set_memory_byte_limit(limit));
    }

    /// Sets the memory entry limit; lowering it can evict immediately.
    pub fn set_memory_count_limit(&self, limit: usize) {
        let _ = self.serializer.submit(move |state| state.set_memory_count_limit(limit));
    }

    /// Sets the disk byte budget and, if active, trims to it immediately.
    pub fn set_disk_byte_limit(&self, limit: u64) {
        let _ = self.serializer.submit(move |state| state.set_disk_byte_limit(limit));
    }

    /// Sets the disk max age and, if active, age-trims immediately.
    pub fn set_disk_max_age_secs(&self, secs: u64) {
        let _ = self.serializer.submit(move |state| state.set_disk_max_age_secs(secs));
    }

    // == Hooks ==
    /// Registers an observer invoked just before an entry leaves the
    /// memory tier, with the key, the evicted blob, and the disk copy's
    /// location if one exists. Runs on the cache worker.
    pub fn set_memory_eviction_hook<F>(&self, hook: F)
    where
        F: Fn(&str, &Blob, Option<&Path>) + Send + Sync + 'static,
    {
        let hook: MemoryEvictionHook = Arc::new(hook);
        let _ = self.serializer.submit(move |state| state.set_memory_eviction_hook(hook));
    }

    /// Registers an observer invoked just before a file leaves the disk
    /// tier. Explicit removals pass the logical key; trim walks pass the
    /// digest filename, since the key is not recoverable from it.
    pub fn set_disk_eviction_hook<F>(&self, hook: F)
    where
        F: Fn(&str, &Path) + Send + Sync + 'static,
    {
        let hook: DiskEvictionHook = Arc::new(hook);
        let _ = self.serializer.submit(move |state| state.set_disk_eviction_hook(hook));
    }

    // == Snapshots ==
    /// Consistent snapshot of the byte and entry totals of both tiers.
    pub fn counters(&self) -> Result<CacheCounters> {
        self.serializer.submit_wait(|state| state.counters())
    }

    /// Awaitable variant of `counters`, for callers inside a runtime.
    pub async fn counters_async(&self) -> Result<CacheCounters> {
        let rx = self.serializer.request(|state| state.counters())?;
        rx.await.map_err(|_| CacheError::Closed)
    }

    /// Consistent snapshot of the current limits.
    pub fn config(&self) -> Result<CacheConfig> {
        self.serializer.submit_wait(|state| state.config())
    }

    /// Whether `key` is resident in the memory tier, without promoting.
    #[cfg(test)]
    pub(crate) fn memory_contains(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.serializer.submit_wait(move |state| state.memory_contains(&key))
    }
}

// == Weak Blob Cache ==
/// Handle that references a cache instance without keeping it alive.
///
/// Produced by [`BlobCache::downgrade`]. Upgrading fails once every
/// strong handle has been dropped.
#[derive(Clone)]
pub struct WeakBlobCache {
    serializer: WeakSerializer<CacheState>,
}

impl WeakBlobCache {
    /// Recovers a strong handle while the instance is still alive.
    pub fn upgrade(&self) -> Option<BlobCache> {
        self.serializer
            .upgrade()
            .map(|serializer| BlobCache { serializer })
    }
}

fn empty_lookup(key: String) -> Lookup {
    Lookup {
        key,
        blob: None,
        file_location: None,
    }
}
