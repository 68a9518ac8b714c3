//! Configuration Module
//!
//! Initial limits for a cache instance. Every limit remains mutable at
//! runtime through the corresponding `BlobCache` setter; the values here
//! only seed the instance.

use std::env;

use serde::{Deserialize, Serialize};

// == Defaults ==
/// Default memory tier byte budget (10 MiB).
pub const DEFAULT_MEMORY_BYTE_LIMIT: u64 = 10 * 1024 * 1024;

/// Sentinel meaning "no limit" for any of the limit fields.
pub const UNLIMITED: u64 = 0;

/// Cache instance limits.
///
/// A value of 0 means unlimited for every field except `memory_byte_limit`,
/// where 0 likewise disables the byte budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Memory tier byte budget
    pub memory_byte_limit: u64,
    /// Memory tier entry-count limit (0 = unlimited)
    pub memory_count_limit: usize,
    /// Disk tier byte budget (0 = unlimited)
    pub disk_byte_limit: u64,
    /// Maximum age of a disk file in seconds before it becomes eligible
    /// for the age trim (0 = unlimited)
    pub disk_max_age_secs: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `BLOBCACHE_MEMORY_BYTE_LIMIT` - Memory byte budget (default: 10 MiB)
    /// - `BLOBCACHE_MEMORY_COUNT_LIMIT` - Memory entry limit (default: unlimited)
    /// - `BLOBCACHE_DISK_BYTE_LIMIT` - Disk byte budget (default: unlimited)
    /// - `BLOBCACHE_DISK_MAX_AGE_SECS` - Disk max age in seconds (default: unlimited)
    pub fn from_env() -> Self {
        Self {
            memory_byte_limit: env::var("BLOBCACHE_MEMORY_BYTE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MEMORY_BYTE_LIMIT),
            memory_count_limit: env::var("BLOBCACHE_MEMORY_COUNT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(UNLIMITED as usize),
            disk_byte_limit: env::var("BLOBCACHE_DISK_BYTE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(UNLIMITED),
            disk_max_age_secs: env::var("BLOBCACHE_DISK_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(UNLIMITED),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_byte_limit: DEFAULT_MEMORY_BYTE_LIMIT,
            memory_count_limit: 0,
            disk_byte_limit: 0,
            disk_max_age_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.memory_byte_limit, DEFAULT_MEMORY_BYTE_LIMIT);
        assert_eq!(config.memory_count_limit, 0);
        assert_eq!(config.disk_byte_limit, 0);
        assert_eq!(config.disk_max_age_secs, 0);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("BLOBCACHE_MEMORY_BYTE_LIMIT");
        env::remove_var("BLOBCACHE_MEMORY_COUNT_LIMIT");
        env::remove_var("BLOBCACHE_DISK_BYTE_LIMIT");
        env::remove_var("BLOBCACHE_DISK_MAX_AGE_SECS");

        let config = CacheConfig::from_env();
        assert_eq!(config.memory_byte_limit, DEFAULT_MEMORY_BYTE_LIMIT);
        assert_eq!(config.memory_count_limit, 0);
        assert_eq!(config.disk_byte_limit, 0);
        assert_eq!(config.disk_max_age_secs, 0);
    }
}
