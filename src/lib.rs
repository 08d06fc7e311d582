//! Rewind - record/replay cache for HTTP request-response traffic
//!
//! Capture real interactions once, then recall them by request or replay
//! them in bulk, from memory or from a folder tree on disk.

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::multiple_crate_versions
)]

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod message;
pub mod predicate;
pub mod recall;
pub mod replay;
pub mod storage;

pub use cache::Cache;
pub use error::{Result, RewindError};
pub use fingerprint::Fingerprint;
pub use message::{Message, MessageKind, Request, Response};
pub use predicate::{IdGenerator, Predicate};
pub use recall::{DiskCacheRecall, MemoryCacheRecall, Recall};
pub use replay::{DiskQueueReplay, MemoryQueueReplay, Replay, ReplayOrder};
pub use storage::{
    DiskCacheStorage, DiskQueueStorage, MemoryCacheStorage, MemoryCacheStore, MemoryQueueStorage,
    MemoryQueueStore, Record, Storage, StoreLocation,
};
