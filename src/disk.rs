//! Disk Store Module
//!
//! Filesystem accessor for the disk tier. Every operation is best-effort:
//! filesystem errors are logged and reported to the caller as a failure or
//! an absent value, never propagated as an error. Callers update their
//! bookkeeping only on confirmed success so counters never overcount.
//!
//! The directory itself is the source of truth for the disk tier; no
//! in-memory index of disk contents is kept.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

// == File Attributes ==
/// Attributes of a single cache file, captured during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttrs {
    /// Absolute path of the file
    pub path: PathBuf,
    /// File length in bytes
    pub len: u64,
    /// Last modification time
    pub modified: SystemTime,
}

// == Disk Store ==
/// Flat-directory file store rooted at a single cache directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Cache directory holding one file per entry
    root: PathBuf,
}

impl DiskStore {
    // == Constructor ==
    /// Creates a DiskStore rooted at `root`. The directory is not created
    /// until `ensure_directory` is called.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path a file with the given name would occupy.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    // == Directory Management ==
    /// Creates the cache directory (and parents) if missing.
    ///
    /// Returns false if creation failed; the error is logged.
    pub fn ensure_directory(&self) -> bool {
        match fs::create_dir_all(&self.root) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to create cache directory {}: {}", self.root.display(), e);
                false
            }
        }
    }

    /// Deletes the entire cache directory subtree and recreates it empty.
    ///
    /// A missing directory is not an error, so this is idempotent.
    pub fn remove_all(&self) -> bool {
        if let Err(e) = fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove cache directory {}: {}", self.root.display(), e);
                return false;
            }
        }
        self.ensure_directory()
    }

    // == Per-File Operations ==
    /// Returns true if a regular file exists at `path`.
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Returns the byte length of the file at `path`, or None if absent
    /// or unreadable.
    pub fn file_len(&self, path: &Path) -> Option<u64> {
        match fs::metadata(path) {
            Ok(md) if md.is_file() => Some(md.len()),
            Ok(_) => None,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to stat {}: {}", path.display(), e);
                }
                None
            }
        }
    }

    /// Reads the file at `path`, returning None if absent or on any read
    /// failure.
    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {}", path.display(), e);
                }
                None
            }
        }
    }

    /// Writes `bytes` to `path`, creating the cache directory first if it
    /// has gone missing. Returns false on failure.
    pub fn write(&self, path: &Path, bytes: &[u8]) -> bool {
        self.ensure_directory();
        match fs::write(path, bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Deletes the file at `path`. Returns true only on confirmed removal.
    pub fn delete(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to delete {}: {}", path.display(), e);
                }
                false
            }
        }
    }

    /// Sets the modification time of the file at `path`.
    ///
    /// Used to mark a file as recently read so the age trim treats it as
    /// fresh. Returns false on failure.
    pub fn touch(&self, path: &Path, time: SystemTime) -> bool {
        let file = match OpenOptions::new().append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                debug!("Failed to open {} for touch: {}", path.display(), e);
                return false;
            }
        };
        match file.set_modified(time) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to touch {}: {}", path.display(), e);
                false
            }
        }
    }

    // == Enumeration ==
    /// Lists every regular file in the cache directory with its attributes.
    ///
    /// Unreadable entries are skipped with a log line. No ordering is
    /// guaranteed; callers sort as needed.
    pub fn list_with_attributes(&self) -> Vec<FileAttrs> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to list cache directory {}: {}", self.root.display(), e);
                }
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            let md = match entry.metadata() {
                Ok(md) => md,
                Err(e) => {
                    warn!("Failed to stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !md.is_file() {
                continue;
            }
            let modified = match md.modified() {
                Ok(t) => t,
                Err(e) => {
                    warn!("No modification time for {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            files.push(FileAttrs {
                path: entry.path(),
                len: md.len(),
                modified,
            });
        }
        files
    }
}
