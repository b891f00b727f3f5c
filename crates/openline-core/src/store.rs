//! # Stream Store
//!
//! Keyed cache `stream_id -> last accepted Digest`.
//!
//! The store is the only shared mutable state in the core. Writers use
//! compare-and-set so that a read-guard-commit sequence is atomic per stream
//! without holding a lock across guard evaluation.

use crate::{Digest, OpenlineError};
use std::collections::BTreeMap;
use std::sync::Mutex;

// =============================================================================
// STREAMSTORE TRAIT
// =============================================================================

/// Backend for the latest accepted digest of each stream.
///
/// All fallible operations return `Result<T, OpenlineError>` so that other
/// backends can report their own failures uniformly.
pub trait StreamStore: Send + Sync {
    /// Latest accepted digest for a stream.
    fn get(&self, stream_id: &str) -> Result<Option<Digest>, OpenlineError>;

    /// Replace the entry with `new` if it currently equals `expected`.
    ///
    /// `expected == None` means the stream must not exist yet. Returns
    /// `false` when another writer got there first.
    fn compare_and_set(
        &self,
        stream_id: &str,
        expected: Option<&Digest>,
        new: Digest,
    ) -> Result<bool, OpenlineError>;

    /// Number of known streams.
    fn len(&self) -> Result<usize, OpenlineError>;

    /// Are there no streams?
    fn is_empty(&self) -> Result<bool, OpenlineError> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// Mutex-guarded `BTreeMap` backend. Entries are never evicted.
#[derive(Debug, Default)]
pub struct InMemoryStreamStore {
    streams: Mutex<BTreeMap<String, Digest>>,
}

impl InMemoryStreamStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamStore for InMemoryStreamStore {
    fn get(&self, stream_id: &str) -> Result<Option<Digest>, OpenlineError> {
        let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        Ok(streams.get(stream_id).cloned())
    }

    fn compare_and_set(
        &self,
        stream_id: &str,
        expected: Option<&Digest>,
        new: Digest,
    ) -> Result<bool, OpenlineError> {
        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        if streams.get(stream_id) != expected {
            return Ok(false);
        }
        streams.insert(stream_id.to_string(), new);
        Ok(true)
    }

    fn len(&self) -> Result<usize, OpenlineError> {
        let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        Ok(streams.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
