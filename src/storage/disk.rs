//! Disk-backed storage

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::layout::{self, REQUEST_FILE, RESPONSE_FILE};
use super::{admit, Storage, StoreLocation};
use crate::fingerprint::Fingerprint;
use crate::message::{Request, Response};
use crate::predicate::{IdGenerator, Predicate};
use crate::Result;

/// Storage keyed by fingerprint under a base directory
///
/// Storing an identical request again overwrites the files it wrote before.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    base_dir: PathBuf,
    predicate: Predicate,
}

impl DiskCacheStorage {
    /// Create a storage rooted at `base_dir`
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, predicate: Predicate) -> Self {
        Self {
            base_dir: base_dir.into(),
            predicate,
        }
    }

    /// Base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Storage for DiskCacheStorage {
    fn set(&self, request: &Request, response: &Response) -> Result<()> {
        if !admit(&self.predicate, request, response)? {
            debug!("Skipped disk cache entry: {}", Fingerprint::of(request));
            return Ok(());
        }

        let folder = layout::cache_folder(&self.base_dir, request);
        write_pair(&folder, request, response)?;

        debug!(
            "Cached on disk: {} {} -> {} ({})",
            request.method(),
            request.uri(),
            response.status(),
            Fingerprint::of(request)
        );

        Ok(())
    }

    fn location(&self) -> StoreLocation {
        StoreLocation::disk(&self.base_dir)
    }
}

/// Append-only storage: one fresh folder per stored pair
#[derive(Debug, Clone)]
pub struct DiskQueueStorage {
    base_dir: PathBuf,
    predicate: Predicate,
    ids: IdGenerator,
}

impl DiskQueueStorage {
    /// Create a storage rooted at `base_dir` using timestamped folder ids
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, predicate: Predicate) -> Self {
        Self::with_ids(base_dir, predicate, IdGenerator::default())
    }

    /// Create a storage with a custom id generator
    #[must_use]
    pub fn with_ids(base_dir: impl Into<PathBuf>, predicate: Predicate, ids: IdGenerator) -> Self {
        Self {
            base_dir: base_dir.into(),
            predicate,
            ids,
        }
    }

    /// Base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Storage for DiskQueueStorage {
    fn set(&self, request: &Request, response: &Response) -> Result<()> {
        if !admit(&self.predicate, request, response)? {
            debug!("Skipped disk queue entry: {} {}", request.method(), request.uri());
            return Ok(());
        }

        let id = self.ids.next_id();
        layout::validate_queue_id(&id)?;

        // create_dir fails on an existing folder, so ids never overwrite
        fs::create_dir_all(&self.base_dir)?;
        let folder = self.base_dir.join(&id);
        fs::create_dir(&folder)?;

        write_pair(&folder, request, response)?;

        debug!(
            "Queued on disk: {} {} -> {} (id: {})",
            request.method(),
            request.uri(),
            response.status(),
            id
        );

        Ok(())
    }

    fn location(&self) -> StoreLocation {
        StoreLocation::disk(&self.base_dir)
    }
}

/// Write both halves; the response goes last since recall only reads it
fn write_pair(folder: &Path, request: &Request, response: &Response) -> Result<()> {
    layout::write_message(folder, REQUEST_FILE, request)?;
    layout::write_message(folder, RESPONSE_FILE, response)
}
