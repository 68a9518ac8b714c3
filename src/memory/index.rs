//! Memory Index Module
//!
//! Bounded associative store of key to blob with a byte-cost budget and an
//! optional entry-count limit, evicting in least-recently-used order.
//!
//! Evictions the index performs on its own initiative are reported back to
//! the caller as returned blobs. Deliberately, only the value comes back,
//! never the key; recovering the key is the reverse map's job.

use std::collections::{HashMap, VecDeque};

use crate::memory::Blob;

// == Put Outcome ==
/// What a `put` did besides inserting the new entry.
#[derive(Debug, Default)]
pub struct PutOutcome {
    /// Previous blob stored under the same key, if any
    pub replaced: Option<Blob>,
    /// Blobs evicted to bring the index back within its limits
    pub evicted: Vec<Blob>,
}

// == Memory Index ==
/// Cost-bounded LRU index of key to blob.
///
/// The cost of an entry is its byte length. When an insert or a limit
/// change pushes the index over budget, least-recently-used entries are
/// evicted until the budget holds again. The sole remaining entry is never
/// evicted, so a single blob larger than the byte budget stays resident
/// until displaced.
#[derive(Debug)]
pub struct MemoryIndex {
    /// Key-value storage
    entries: HashMap<String, Blob>,
    /// Recency order: front = most recently used, back = least
    recency: VecDeque<String>,
    /// Sum of the byte lengths of all resident blobs
    total_cost: u64,
    /// Byte budget (0 = unlimited)
    cost_limit: u64,
    /// Entry-count limit (0 = unlimited)
    count_limit: usize,
}

impl MemoryIndex {
    // == Constructor ==
    /// Creates an empty index with the given limits. 0 disables a limit.
    pub fn new(cost_limit: u64, count_limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: VecDeque::new(),
            total_cost: 0,
            cost_limit,
            count_limit,
        }
    }

    // == Put ==
    /// Inserts or overwrites the entry for `key`.
    ///
    /// Returns the replaced blob (on overwrite) and any entries evicted to
    /// restore the limits. The new entry is marked most recently used.
    pub fn put(&mut self, key: &str, blob: Blob) -> PutOutcome {
        let cost = blob.len() as u64;
        let replaced = self.entries.insert(key.to_string(), blob);
        if let Some(old) = &replaced {
            self.total_cost = self.total_cost.saturating_sub(old.len() as u64);
        }
        self.total_cost += cost;
        self.mark_used(key);

        PutOutcome {
            replaced,
            evicted: self.enforce_limits(),
        }
    }

    // == Get ==
    /// Returns the blob for `key` and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<Blob> {
        let blob = self.entries.get(key).cloned()?;
        self.mark_used(key);
        Some(blob)
    }

    /// Returns true if `key` is resident, without touching recency.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Remove ==
    /// Removes and returns the entry for `key`, if resident.
    ///
    /// This is a caller-initiated removal, not an eviction; nothing is
    /// reported back.
    pub fn remove(&mut self, key: &str) -> Option<Blob> {
        let blob = self.entries.remove(key)?;
        self.recency.retain(|k| k != key);
        self.total_cost = self.total_cost.saturating_sub(blob.len() as u64);
        Some(blob)
    }

    /// Drops every entry. Bulk clear, no per-entry eviction reports.
    pub fn remove_all(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.total_cost = 0;
    }

    // == Limits ==
    /// Sets the byte budget and returns any entries evicted to meet it.
    pub fn set_cost_limit(&mut self, limit: u64) -> Vec<Blob> {
        self.cost_limit = limit;
        self.enforce_limits()
    }

    /// Sets the entry-count limit and returns any entries evicted to meet it.
    pub fn set_count_limit(&mut self, limit: usize) -> Vec<Blob> {
        self.count_limit = limit;
        self.enforce_limits()
    }

    /// Current byte budget (0 = unlimited).
    pub fn cost_limit(&self) -> u64 {
        self.cost_limit
    }

    /// Current entry-count limit (0 = unlimited).
    pub fn count_limit(&self) -> usize {
        self.count_limit
    }

    // == Accessors ==
    /// Sum of the byte lengths of all resident blobs.
    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Internals ==
    /// Moves `key` to the front of the recency order.
    fn mark_used(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
        self.recency.push_front(key.to_string());
    }

    /// Evicts least-recently-used entries until the limits hold, keeping
    /// at least the most recent entry resident.
    fn enforce_limits(&mut self) -> Vec<Blob> {
        let mut evicted = Vec::new();
        while self.over_budget() && self.entries.len() > 1 {
            let Some(oldest) = self.recency.pop_back() else {
                break;
            };
            if let Some(blob) = self.entries.remove(&oldest) {
                self.total_cost = self.total_cost.saturating_sub(blob.len() as u64);
                evicted.push(blob);
            }
        }
        evicted
    }

    fn over_budget(&self) -> bool {
        (self.cost_limit > 0 && self.total_cost > self.cost_limit)
            || (self.count_limit > 0 && self.entries.len() > self.count_limit)
    }
}
