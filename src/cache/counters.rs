//! Bookkeeping Counters Module
//!
//! Tracks the byte and entry totals of both cache tiers. Updated
//! incrementally on every confirmed mutation; the disk pair is reconciled
//! from a directory scan once at startup.

use serde::Serialize;

// == Cache Counters ==
/// Byte and entry totals for the memory and disk tiers.
///
/// Invariant: equal to the sum of sizes and count of entries actually
/// present in each tier. Increments happen only on confirmed success, so
/// the counters never overcount; decrements saturate at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    /// Bytes resident in the memory tier
    pub memory_bytes: u64,
    /// Entries resident in the memory tier
    pub memory_count: usize,
    /// Bytes stored in the disk tier
    pub disk_bytes: u64,
    /// Files stored in the disk tier
    pub disk_count: usize,
}

impl CacheCounters {
    /// Creates counters with all totals at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Memory Tier ==
    /// Records one entry of `bytes` entering the memory tier.
    pub fn add_memory(&mut self, bytes: u64) {
        self.memory_bytes += bytes;
        self.memory_count += 1;
    }

    /// Records one entry of `bytes` leaving the memory tier.
    pub fn sub_memory(&mut self, bytes: u64) {
        self.memory_bytes = self.memory_bytes.saturating_sub(bytes);
        self.memory_count = self.memory_count.saturating_sub(1);
    }

    /// Zeroes the memory tier totals after a bulk clear.
    pub fn reset_memory(&mut self) {
        self.memory_bytes = 0;
        self.memory_count = 0;
    }

    // == Disk Tier ==
    /// Records one file of `bytes` entering the disk tier.
    pub fn add_disk(&mut self, bytes: u64) {
        self.disk_bytes += bytes;
        self.disk_count += 1;
    }

    /// Records one file of `bytes` leaving the disk tier.
    pub fn sub_disk(&mut self, bytes: u64) {
        self.disk_bytes = self.disk_bytes.saturating_sub(bytes);
        self.disk_count = self.disk_count.saturating_sub(1);
    }

    /// Zeroes the disk tier totals after a bulk clear.
    pub fn reset_disk(&mut self) {
        self.disk_bytes = 0;
        self.disk_count = 0;
    }
}
