//! Cache State Module
//!
//! Worker-owned state of a cache instance and the operation bodies that
//! run against it. Everything here executes on the serializer's worker
//! thread, one job at a time, so no field needs its own synchronization.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info};

use crate::cache::counters::CacheCounters;
use crate::config::CacheConfig;
use crate::digest::key_digest;
use crate::disk::{DiskStore, FileAttrs};
use crate::memory::{blob_identity, Blob, MemoryIndex, ReverseMap};

// == Lookup ==
/// Result of a cache operation, delivered to completion callbacks.
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The key the operation was invoked with
    pub key: String,
    /// The value, if the operation produced one
    pub blob: Option<Blob>,
    /// Location of the disk copy, if one exists (for removals, the path
    /// the removal targeted)
    pub file_location: Option<PathBuf>,
}

// == Eviction Hooks ==
/// Observer invoked just before an entry leaves the memory tier, with the
/// key, the evicted blob, and the disk copy's location if one exists.
pub type MemoryEvictionHook = Arc<dyn Fn(&str, &Blob, Option<&Path>) + Send + Sync>;

/// Observer invoked just before a file leaves the disk tier. During trim
/// walks the logical key is not recoverable from the one-way filename, so
/// the digest is passed as the key in that case.
pub type DiskEvictionHook = Arc<dyn Fn(&str, &Path) + Send + Sync>;

// == Cache State ==
/// All mutable state of one cache instance.
pub(crate) struct CacheState {
    memory: MemoryIndex,
    reverse: ReverseMap,
    disk: DiskStore,
    counters: CacheCounters,
    disk_byte_limit: u64,
    disk_max_age_secs: u64,
    memory_eviction_hook: Option<MemoryEvictionHook>,
    disk_eviction_hook: Option<DiskEvictionHook>,
}

impl CacheState {
    // == Constructor ==
    /// Builds the state, creates the cache directory, and reconciles the
    /// disk counters from a directory scan.
    pub(crate) fn new(disk: DiskStore, config: &CacheConfig) -> Self {
        disk.ensure_directory();

        let mut counters = CacheCounters::new();
        for attrs in disk.list_with_attributes() {
            counters.add_disk(attrs.len);
        }
        info!(
            "Cache at {} reconciled: {} files, {} bytes on disk",
            disk.root().display(),
            counters.disk_count,
            counters.disk_bytes
        );

        Self {
            memory: MemoryIndex::new(config.memory_byte_limit, config.memory_count_limit),
            reverse: ReverseMap::new(),
            disk,
            counters,
            disk_byte_limit: config.disk_byte_limit,
            disk_max_age_secs: config.disk_max_age_secs,
            memory_eviction_hook: None,
            disk_eviction_hook: None,
        }
    }

    // == Fetch ==
    /// Looks up `key` in the memory tier, falling back to disk.
    ///
    /// A disk hit refreshes the file's modification time and promotes the
    /// value into the memory tier, so repeatedly read entries stay fresh
    /// for the age trim and cheap for the next read.
    pub(crate) fn fetch(&mut self, key: &str) -> Lookup {
        let path = self.disk.path_for(&key_digest(key));

        if let Some(blob) = self.memory.get(key) {
            let file_location = self.disk.exists(&path).then_some(path);
            return Lookup {
                key: key.to_string(),
                blob: Some(blob),
                file_location,
            };
        }

        if !self.disk.exists(&path) {
            return Lookup {
                key: key.to_string(),
                blob: None,
                file_location: None,
            };
        }

        self.disk.touch(&path, SystemTime::now());
        let blob = self.disk.read(&path).map(|bytes| {
            let blob: Blob = bytes.into();
            self.insert_memory(key, blob.clone());
            blob
        });
        // A failed read degrades to a miss; the file still exists
        Lookup {
            key: key.to_string(),
            blob,
            file_location: Some(path),
        }
    }

    /// Returns the disk copy's location for `key` without touching the
    /// memory tier or the file's modification time.
    pub(crate) fn file_location(&self, key: &str) -> Option<PathBuf> {
        let path = self.disk.path_for(&key_digest(key));
        self.disk.exists(&path).then_some(path)
    }

    // == Store ==
    /// Stores `blob` under `key` in both tiers. A `None` blob removes the
    /// entry instead.
    ///
    /// Disk counters move only on a confirmed write; an overwrite adjusts
    /// for the previous file's size first.
    pub(crate) fn store(&mut self, key: &str, blob: Option<Blob>) -> Lookup {
        let Some(blob) = blob else {
            return self.remove(key);
        };

        self.insert_memory(key, blob.clone());

        let path = self.disk.path_for(&key_digest(key));
        let previous_len = self.disk.file_len(&path);
        let mut file_location = None;
        if self.disk.write(&path, &blob) {
            if let Some(old) = previous_len {
                self.counters.sub_disk(old);
            }
            self.counters.add_disk(blob.len() as u64);
            file_location = Some(path);
        }

        Lookup {
            key: key.to_string(),
            blob: Some(blob),
            file_location,
        }
    }

    /// Runs whichever disk trims the current limits make active. Called
    /// after every store, once its completion has been delivered.
    pub(crate) fn trim_after_store(&mut self) {
        if self.disk_byte_limit > 0 && self.counters.disk_bytes > self.disk_byte_limit {
            self.trim_disk_to_bytes(self.disk_byte_limit);
        }
        self.trim_expired();
    }

    /// Age-trims the disk tier if a max age is configured.
    pub(crate) fn trim_expired(&mut self) {
        if self.disk_max_age_secs == 0 {
            return;
        }
        let Some(cutoff) =
            SystemTime::now().checked_sub(Duration::from_secs(self.disk_max_age_secs))
        else {
            return;
        };
        self.trim_disk_to_date(cutoff);
    }

    // == Remove ==
    /// Removes `key` from both tiers.
    ///
    /// The returned lookup carries the path the disk removal targeted,
    /// whether or not a file was actually there.
    pub(crate) fn remove(&mut self, key: &str) -> Lookup {
        if let Some(old) = self.memory.remove(key) {
            self.reverse.lookup_and_remove(blob_identity(&old));
            self.counters.sub_memory(old.len() as u64);
        }

        let path = self.disk.path_for(&key_digest(key));
        if let Some(len) = self.disk.file_len(&path) {
            if let Some(hook) = self.disk_eviction_hook.clone() {
                hook(key, &path);
            }
            if self.disk.delete(&path) {
                self.counters.sub_disk(len);
            }
        }

        Lookup {
            key: key.to_string(),
            blob: None,
            file_location: Some(path),
        }
    }

    // == Clears ==
    /// Drops every memory entry. Bulk clear: per-entry eviction hooks are
    /// deliberately bypassed.
    pub(crate) fn clear_memory(&mut self) {
        self.memory.remove_all();
        self.reverse.clear();
        self.counters.reset_memory();
        debug!("Memory tier cleared");
    }

    /// Deletes the entire cache directory subtree, recreates it empty,
    /// and zeroes the disk counters.
    pub(crate) fn clear_disk(&mut self) {
        self.disk.remove_all();
        self.counters.reset_disk();
        debug!("Disk tier cleared");
    }

    // == Disk Trimming ==
    /// Deletes oldest files first until the disk tier is within `limit`
    /// bytes. A limit of 0 clears the disk tier entirely.
    pub(crate) fn trim_disk_to_bytes(&mut self, limit: u64) {
        if limit == 0 {
            self.clear_disk();
            return;
        }
        if self.counters.disk_bytes <= limit {
            return;
        }
        let before = self.counters;
        for attrs in self.snapshot_oldest_first() {
            if self.counters.disk_bytes <= limit {
                break;
            }
            self.evict_disk_file(&attrs);
        }
        info!(
            "Byte trim to {} bytes removed {} files",
            limit,
            before.disk_count - self.counters.disk_count
        );
    }

    /// Deletes every file whose modification time is at or before
    /// `cutoff`. The epoch sentinel clears the disk tier entirely.
    ///
    /// The snapshot is sorted oldest first, so the walk stops at the first
    /// file newer than the cutoff.
    pub(crate) fn trim_disk_to_date(&mut self, cutoff: SystemTime) {
        if cutoff == SystemTime::UNIX_EPOCH {
            self.clear_disk();
            return;
        }
        let before = self.counters;
        for attrs in self.snapshot_oldest_first() {
            if attrs.modified > cutoff {
                break;
            }
            self.evict_disk_file(&attrs);
        }
        let removed = before.disk_count - self.counters.disk_count;
        if removed > 0 {
            info!("Age trim removed {} files", removed);
        }
    }

    /// Snapshot of the cache directory sorted ascending by modification
    /// time, ties broken by filename for a deterministic order.
    fn snapshot_oldest_first(&self) -> Vec<FileAttrs> {
        let mut files = self.disk.list_with_attributes();
        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        files
    }

    /// Notifies the disk hook and deletes one file, moving counters only
    /// on confirmed deletion.
    fn evict_disk_file(&mut self, attrs: &FileAttrs) {
        if let Some(hook) = self.disk_eviction_hook.clone() {
            let digest = attrs.path.file_name().map(|n| n.to_string_lossy().into_owned());
            hook(digest.as_deref().unwrap_or_default(), &attrs.path);
        }
        if self.disk.delete(&attrs.path) {
            self.counters.sub_disk(attrs.len);
        }
    }

    // == Memory Insertion and Eviction ==
    /// Inserts `blob` under `key` in the memory tier, keeps the reverse
    /// map and counters in step, and processes any evictions the index
    /// performed to stay within its limits.
    ///
    /// On overwrite the old blob's reverse entry is removed here, eagerly:
    /// the index no longer holds that blob, so it would never be reported
    /// evicted and the entry would otherwise linger forever.
    fn insert_memory(&mut self, key: &str, blob: Blob) {
        let outcome = self.memory.put(key, blob.clone());
        if let Some(old) = outcome.replaced {
            self.reverse.lookup_and_remove(blob_identity(&old));
            self.counters.sub_memory(old.len() as u64);
        }
        self.reverse.associate(blob_identity(&blob), key);
        self.counters.add_memory(blob.len() as u64);
        self.handle_memory_evictions(outcome.evicted);
    }

    /// Translates the index's value-only eviction reports into key-level
    /// events: recover the key through the reverse map, notify the hook
    /// with the disk copy's location, and decrement the memory counters.
    pub(crate) fn handle_memory_evictions(&mut self, evicted: Vec<Blob>) {
        for blob in evicted {
            match self.reverse.lookup_and_remove(blob_identity(&blob)) {
                Some(key) => {
                    if let Some(hook) = self.memory_eviction_hook.clone() {
                        let path = self.disk.path_for(&key_digest(&key));
                        let location = self.disk.exists(&path).then_some(path);
                        hook(&key, &blob, location.as_deref());
                    }
                }
                None => debug!("Evicted blob had no reverse entry"),
            }
            self.counters.sub_memory(blob.len() as u64);
        }
    }

    // == Limits ==
    pub(crate) fn memory_byte_limit(&self) -> u64 {
        self.memory.cost_limit()
    }

    pub(crate) fn memory_count_limit(&self) -> usize {
        self.memory.count_limit()
    }

    pub(crate) fn disk_byte_limit(&self) -> u64 {
        self.disk_byte_limit
    }

    pub(crate) fn disk_max_age_secs(&self) -> u64 {
        self.disk_max_age_secs
    }

    /// Lowering the memory byte budget can evict immediately.
    pub(crate) fn set_memory_byte_limit(&mut self, limit: u64) {
        let evicted = self.memory.set_cost_limit(limit);
        self.handle_memory_evictions(evicted);
    }

    /// Lowering the memory entry limit can evict immediately.
    pub(crate) fn set_memory_count_limit(&mut self, limit: usize) {
        let evicted = self.memory.set_count_limit(limit);
        self.handle_memory_evictions(evicted);
    }

    /// Setting an active disk byte budget trims to it immediately.
    pub(crate) fn set_disk_byte_limit(&mut self, limit: u64) {
        self.disk_byte_limit = limit;
        if limit > 0 {
            self.trim_disk_to_bytes(limit);
        }
    }

    /// Setting an active disk max age trims to it immediately.
    pub(crate) fn set_disk_max_age_secs(&mut self, secs: u64) {
        self.disk_max_age_secs = secs;
        self.trim_expired();
    }

    // == Hooks ==
    pub(crate) fn set_memory_eviction_hook(&mut self, hook: MemoryEvictionHook) {
        self.memory_eviction_hook = Some(hook);
    }

    pub(crate) fn set_disk_eviction_hook(&mut self, hook: DiskEvictionHook) {
        self.disk_eviction_hook = Some(hook);
    }

    // == Snapshots ==
    pub(crate) fn counters(&self) -> CacheCounters {
        self.counters
    }

    pub(crate) fn config(&self) -> CacheConfig {
        CacheConfig {
            memory_byte_limit: self.memory.cost_limit(),
            memory_count_limit: self.memory.count_limit(),
            disk_byte_limit: self.disk_byte_limit,
            disk_max_age_secs: self.disk_max_age_secs,
        }
    }

    /// Whether `key` is resident in the memory tier. Test visibility into
    /// promotion behavior.
    #[cfg(test)]
    pub(crate) fn memory_contains(&self, key: &str) -> bool {
        self.memory.contains_key(key)
    }
}
