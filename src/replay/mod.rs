//! Replaying everything a queue backend captured
//!
//! Sequences are lazy, finite and restartable: each call scans the store
//! from the beginning. `requests()` and `responses()` filter independently,
//! so the n-th request and n-th response need not come from the same record;
//! use `records()` when the pairing matters.

mod disk;
mod memory;

use serde::{Deserialize, Serialize};

pub use disk::DiskQueueReplay;
pub use memory::MemoryQueueReplay;

use crate::message::{Request, Response};
use crate::storage::Record;
use crate::Result;

/// Lazy sequence of replayed items
pub type Messages<'a, T> = Box<dyn Iterator<Item = Result<T>> + Send + 'a>;

/// Order in which disk record folders are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayOrder {
    /// Lexicographic by folder name
    #[default]
    Sorted,
    /// Whatever order the filesystem lists folders in
    Listing,
}

/// Ordered playback of stored traffic
pub trait Replay: Send + Sync {
    /// Stored requests accepted by the replay predicate
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be scanned; per-entry failures are
    /// yielded as items
    fn requests(&self) -> Result<Messages<'_, Request>>;

    /// Stored responses accepted by the replay predicate
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be scanned; per-entry failures are
    /// yielded as items
    fn responses(&self) -> Result<Messages<'_, Response>>;

    /// Whole records whose request or response the predicate accepts
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be scanned; per-entry failures are
    /// yielded as items
    fn records(&self) -> Result<Messages<'_, Record>>;
}
