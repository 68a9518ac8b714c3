//! Memory Tier Module
//!
//! Provides the bounded in-memory blob index and the identity-keyed
//! reverse map that translates its value-only eviction reports back into
//! key-level events.

mod index;
mod reverse;

pub use index::{MemoryIndex, PutOutcome};
pub use reverse::{blob_identity, ReverseMap};

use std::sync::Arc;

/// An immutable cached byte value.
///
/// Blobs are shared by reference: the memory index owns one handle and the
/// reverse map tracks the allocation address, so two blobs with identical
/// bytes are still distinct entries.
pub type Blob = Arc<[u8]>;
