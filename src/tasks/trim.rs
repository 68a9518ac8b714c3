//! Periodic Disk Trim Task
//!
//! Background task that periodically age-trims the disk tier. Without it,
//! files past the configured max age linger until the next store; hosts
//! that mostly read can use this to keep the disk tier current.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::BlobCache;

/// Spawns a background task that periodically posts an age trim.
///
/// The trim is a no-op while no max age is configured, so the task can be
/// started unconditionally. The task only holds a weak handle, so it
/// never keeps the instance alive; it stops on its own once the last
/// strong handle has been dropped.
///
/// # Arguments
/// * `cache` - Handle to the instance to trim
/// * `interval_secs` - Interval in seconds between trim passes
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = BlobCache::new("downloads", CacheConfig::from_env())?;
/// let trim_handle = spawn_trim_task(cache.clone(), 60);
/// // Later, during shutdown:
/// trim_handle.abort();
/// ```
pub fn spawn_trim_task(cache: BlobCache, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    // The task must not keep the instance alive, so it holds a weak
    // handle and upgrades it per tick.
    let cache = cache.downgrade();

    tokio::spawn(async move {
        info!(
            "Starting disk trim task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let trimmed = match cache.upgrade() {
                Some(cache) => cache.trim_expired().is_ok(),
                None => false,
            };
            if !trimmed {
                info!("Cache has shut down, stopping disk trim task");
                break;
            }
            debug!("Posted periodic age trim");
        }
    })
}
