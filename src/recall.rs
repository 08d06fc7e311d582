//! Looking up previously stored responses

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fingerprint::Fingerprint;
use crate::message::{Request, Response};
use crate::storage::layout::{self, RESPONSE_FILE};
use crate::storage::{MemoryCacheStore, StoreLocation};
use crate::{Result, RewindError};

/// Looks up the stored response for a request
pub trait Recall: Send + Sync {
    /// Stored response, or `None` on a miss
    ///
    /// # Errors
    ///
    /// Returns error if a stored response exists but cannot be read
    fn get(&self, request: &Request) -> Result<Option<Response>>;

    /// Store this recall reads from
    fn location(&self) -> StoreLocation;
}

/// Recall over a [`MemoryCacheStore`]
#[derive(Debug, Clone)]
pub struct MemoryCacheRecall {
    store: MemoryCacheStore,
}

impl MemoryCacheRecall {
    /// Create a recall view over a store
    #[must_use]
    pub fn new(store: MemoryCacheStore) -> Self {
        Self { store }
    }
}

impl Recall for MemoryCacheRecall {
    fn get(&self, request: &Request) -> Result<Option<Response>> {
        let fingerprint = Fingerprint::of(request);
        let response = self.store.get(&fingerprint);

        debug!(
            "Memory recall {}: {} {} ({})",
            if response.is_some() { "hit" } else { "miss" },
            request.method(),
            request.uri(),
            fingerprint
        );

        Ok(response)
    }

    fn location(&self) -> StoreLocation {
        self.store.location()
    }
}

/// Recall over the folder layout written by `DiskCacheStorage`
#[derive(Debug, Clone)]
pub struct DiskCacheRecall {
    base_dir: PathBuf,
}

impl DiskCacheRecall {
    /// Create a recall rooted at `base_dir`
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Recall for DiskCacheRecall {
    fn get(&self, request: &Request) -> Result<Option<Response>> {
        let folder = layout::cache_folder(&self.base_dir, request);

        let response = match layout::read_message::<Response>(&folder.join(RESPONSE_FILE)) {
            Err(RewindError::CorruptRecord { path, reason }) => {
                warn!("Corrupt cached response at {}: {}", path.display(), reason);
                return Err(RewindError::CorruptRecord { path, reason });
            }
            result => result?,
        };

        debug!(
            "Disk recall {}: {} {} ({})",
            if response.is_some() { "hit" } else { "miss" },
            request.method(),
            request.uri(),
            Fingerprint::of(request)
        );

        Ok(response)
    }

    fn location(&self) -> StoreLocation {
        StoreLocation::disk(&self.base_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use crate::storage::{DiskCacheStorage, MemoryCacheStorage, Storage};
    use std::fs;
    use tempfile::TempDir;

    fn get_users() -> Request {
        Request::new("GET", "/users?page=1")
    }

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryCacheStore::new();
        let storage = MemoryCacheStorage::new(store.clone(), Predicate::always());
        let recall = MemoryCacheRecall::new(store);
        let response = Response::new(200).with_body("ok");

        storage.set(&get_users(), &response).unwrap();

        assert_eq!(recall.get(&get_users()).unwrap(), Some(response));
    }

    #[test]
    fn test_memory_miss() {
        let recall = MemoryCacheRecall::new(MemoryCacheStore::new());
        assert_eq!(recall.get(&get_users()).unwrap(), None);
    }

    #[test]
    fn test_disk_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(temp_dir.path(), Predicate::always());
        let recall = DiskCacheRecall::new(temp_dir.path());
        let response = Response::new(201)
            .with_header("Location", "/users/9")
            .with_body(vec![1u8, 2, 3]);

        storage.set(&get_users(), &response).unwrap();

        assert_eq!(recall.get(&get_users()).unwrap(), Some(response));
    }

    #[test]
    fn test_disk_miss() {
        let temp_dir = TempDir::new().unwrap();
        let recall = DiskCacheRecall::new(temp_dir.path().join("never-created"));

        assert_eq!(recall.get(&get_users()).unwrap(), None);
    }

    #[test]
    fn test_disk_recall_from_reparsed_request() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(temp_dir.path(), Predicate::always());
        let recall = DiskCacheRecall::new(temp_dir.path());

        let request = get_users().with_header("Accept", "text/plain");
        storage.set(&request, &Response::new(200)).unwrap();

        let text = request.to_string();
        let reparsed = <Request as crate::message::Message>::parse(text.as_bytes()).unwrap();
        assert!(recall.get(&reparsed).unwrap().is_some());
    }

    #[test]
    fn test_disk_corrupt_response_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let folder = layout::cache_folder(temp_dir.path(), &get_users());
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join(RESPONSE_FILE), b"HTTP/1.1 2").unwrap();

        let recall = DiskCacheRecall::new(temp_dir.path());
        let result = recall.get(&get_users());

        assert!(matches!(result, Err(RewindError::CorruptRecord { .. })));
    }

    #[test]
    fn test_disk_request_only_predicate_still_recalls() {
        let temp_dir = TempDir::new().unwrap();
        let only_requests = Predicate::new(|m| m.as_request().is_some());
        let storage = DiskCacheStorage::new(temp_dir.path(), only_requests);
        let recall = DiskCacheRecall::new(temp_dir.path());

        storage.set(&get_users(), &Response::new(500)).unwrap();

        assert_eq!(recall.get(&get_users()).unwrap(), Some(Response::new(500)));
    }
}
