//! Integration Tests for the Blob Cache
//!
//! Exercises the public surface end to end: both tiers, promotion,
//! trimming, hooks, and persistence across instances.

use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use blobcache::{Blob, BlobCache, CacheConfig};

// == Helper Functions ==

/// Installs a tracing subscriber once so `RUST_LOG=blobcache=debug`
/// surfaces the cache's log lines during test runs.
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "blobcache=warn".into()),
            )
            .try_init();
    });
}

fn create_cache(config: CacheConfig) -> (TempDir, BlobCache) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let cache = BlobCache::with_root(dir.path().join("cache"), config).unwrap();
    (dir, cache)
}

fn blob(bytes: &[u8]) -> Blob {
    bytes.to_vec().into()
}

// == Lifecycle Tests ==

#[test]
fn test_full_lifecycle() {
    let (_dir, cache) = create_cache(CacheConfig::default());

    // Store and read back
    let stored = cache.set_blocking("resource", Some(blob(b"payload"))).unwrap();
    let path = stored.file_location.expect("disk write should succeed");
    assert!(path.is_file());

    let lookup = cache.get_blocking("resource").unwrap();
    assert_eq!(lookup.blob.as_deref(), Some(b"payload".as_slice()));

    let counters = cache.counters().unwrap();
    assert_eq!(counters.memory_count, 1);
    assert_eq!(counters.disk_count, 1);
    assert_eq!(counters.disk_bytes, 7);

    // Remove erases both tiers, including the digest file
    cache.remove_blocking("resource").unwrap();
    assert!(!path.exists());
    assert!(cache.get_blocking("resource").unwrap().blob.is_none());
    assert_eq!(cache.counters().unwrap().disk_count, 0);
}

#[test]
fn test_entries_survive_reopening() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("cache");

    {
        let cache = BlobCache::with_root(&root, CacheConfig::default()).unwrap();
        cache.set_blocking("persisted", Some(blob(b"still here"))).unwrap();
    }

    // A new instance over the same directory reconciles its counters from
    // the files and serves the entry from disk
    let reopened = BlobCache::with_root(&root, CacheConfig::default()).unwrap();
    let counters = reopened.counters().unwrap();
    assert_eq!(counters.disk_count, 1);
    assert_eq!(counters.disk_bytes, 10);
    assert_eq!(counters.memory_count, 0);

    let lookup = reopened.get_blocking("persisted").unwrap();
    assert_eq!(lookup.blob.as_deref(), Some(b"still here".as_slice()));
    assert_eq!(reopened.counters().unwrap().memory_count, 1);
}

#[test]
fn test_clear_disk_is_idempotent() {
    let (_dir, cache) = create_cache(CacheConfig::default());
    cache.set_blocking("a", Some(blob(b"data"))).unwrap();

    for _ in 0..2 {
        cache.clear_disk();
        let counters = cache.counters().unwrap();
        assert_eq!(counters.disk_count, 0);
        assert_eq!(counters.disk_bytes, 0);
        assert!(cache.file_location_blocking("a").unwrap().is_none());
    }
}

// == Trimming Tests ==

#[test]
fn test_disk_byte_limit_evicts_oldest_after_set() {
    let (_dir, cache) = create_cache(CacheConfig {
        disk_byte_limit: 8,
        ..CacheConfig::default()
    });

    cache.set_blocking("first", Some(blob(b"aaaa"))).unwrap();
    sleep(Duration::from_millis(50));
    cache.set_blocking("second", Some(blob(b"bbbb"))).unwrap();
    sleep(Duration::from_millis(50));
    cache.set_blocking("third", Some(blob(b"cccc"))).unwrap();

    let counters = cache.counters().unwrap();
    assert!(counters.disk_bytes <= 8, "got {} bytes", counters.disk_bytes);
    assert!(cache.file_location_blocking("first").unwrap().is_none());
    assert!(cache.file_location_blocking("third").unwrap().is_some());
}

#[test]
fn test_max_age_trims_stale_files_on_set() {
    let (_dir, cache) = create_cache(CacheConfig {
        disk_max_age_secs: 1,
        ..CacheConfig::default()
    });

    cache.set_blocking("stale", Some(blob(b"old"))).unwrap();
    sleep(Duration::from_millis(1200));

    // The post-store trim pass removes anything older than the max age
    cache.set_blocking("current", Some(blob(b"new"))).unwrap();

    assert!(cache.file_location_blocking("stale").unwrap().is_none());
    assert!(cache.file_location_blocking("current").unwrap().is_some());
}

#[test]
fn test_get_refreshes_modification_time() {
    let (_dir, cache) = create_cache(CacheConfig::default());

    cache.set_blocking("read", Some(blob(b"r"))).unwrap();
    cache.set_blocking("unread", Some(blob(b"u"))).unwrap();
    sleep(Duration::from_millis(1200));

    // Reading through the disk tier touches the file to now
    cache.clear_memory();
    cache.get_blocking("read").unwrap();

    cache.trim_disk_to_date(SystemTime::now() - Duration::from_millis(600));

    assert!(cache.file_location_blocking("read").unwrap().is_some());
    assert!(cache.file_location_blocking("unread").unwrap().is_none());
}

#[test]
fn test_trim_to_epoch_clears_disk() {
    let (_dir, cache) = create_cache(CacheConfig::default());
    cache.set_blocking("a", Some(blob(b"1"))).unwrap();
    cache.set_blocking("b", Some(blob(b"2"))).unwrap();

    cache.trim_disk_to_date(SystemTime::UNIX_EPOCH);

    let counters = cache.counters().unwrap();
    assert_eq!(counters.disk_count, 0);
    // Memory tier is untouched by a disk trim
    assert_eq!(counters.memory_count, 2);
}

// == Eviction Hook Tests ==

#[test]
fn test_memory_pressure_eviction_notifies_hook_with_disk_location() {
    let (_dir, cache) = create_cache(CacheConfig {
        memory_byte_limit: 3,
        ..CacheConfig::default()
    });

    let events: Arc<Mutex<Vec<(String, usize, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    cache.set_memory_eviction_hook(move |key, evicted, location| {
        sink.lock()
            .unwrap()
            .push((key.to_string(), evicted.len(), location.is_some()));
    });

    cache.set_blocking("a", Some(blob(b"123"))).unwrap();
    cache.set_blocking("b", Some(blob(b"4567"))).unwrap();

    // "a" was pushed out of memory; its disk copy remains and shows up in
    // the hook's location argument
    let events = events.lock().unwrap();
    assert_eq!(events.as_slice(), &[("a".to_string(), 3, true)]);
    drop(events);

    assert!(cache.file_location_blocking("a").unwrap().is_some());
    let lookup = cache.get_blocking("a").unwrap();
    assert_eq!(lookup.blob.as_deref(), Some(b"123".as_slice()));
}

#[test]
fn test_disk_hook_observes_removal_and_trim() {
    let (_dir, cache) = create_cache(CacheConfig::default());

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    cache.set_disk_eviction_hook(move |name, _path| {
        sink.lock().unwrap().push(name.to_string());
    });

    cache.set_blocking("doomed", Some(blob(b"x"))).unwrap();
    cache.remove_blocking("doomed").unwrap();

    cache.set_blocking("trimmed", Some(blob(b"yy"))).unwrap();
    cache.trim_disk_to_bytes(1);
    cache.counters().unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    // Explicit removal reports the logical key; the trim only knows the
    // digest filename
    assert_eq!(events[0], "doomed");
    assert_eq!(events[1].len(), 40);
}

// == Async Surface Tests ==

#[tokio::test]
async fn test_async_and_callback_apis_interleave_in_order() {
    let dir = TempDir::new().unwrap();
    let cache = BlobCache::with_root(dir.path().join("cache"), CacheConfig::default()).unwrap();

    cache.set_with("k", Some(blob(b"from callback")), |_| {});
    let lookup = cache.get("k").await.unwrap();
    assert_eq!(lookup.blob.as_deref(), Some(b"from callback".as_slice()));

    cache.set("k", Some(blob(b"from async"))).await.unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    cache.get_with("k", move |lookup| {
        tx.send(lookup).unwrap();
    });

    let lookup = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(lookup.blob.as_deref(), Some(b"from async".as_slice()));
}

#[tokio::test]
async fn test_async_remove_and_counters() {
    let dir = TempDir::new().unwrap();
    let cache = BlobCache::with_root(dir.path().join("cache"), CacheConfig::default()).unwrap();

    cache.set("a", Some(blob(b"123"))).await.unwrap();
    cache.set("b", Some(blob(b"45"))).await.unwrap();
    cache.remove("a").await.unwrap();

    let counters = cache.counters_async().await.unwrap();
    assert_eq!(counters.memory_count, 1);
    assert_eq!(counters.disk_bytes, 2);
}
