//! Record/replay cache: storage and recall over one store

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::message::{Request, Response};
use crate::predicate::Predicate;
use crate::recall::{DiskCacheRecall, MemoryCacheRecall, Recall};
use crate::storage::{
    DiskCacheStorage, MemoryCacheStorage, MemoryCacheStore, Storage, StoreLocation,
};
use crate::{Result, RewindError};

/// Storage and recall composed into one capability
///
/// Both halves are checked to use the same store, so every write is visible
/// to the next lookup.
#[derive(Clone)]
pub struct Cache {
    storage: Arc<dyn Storage>,
    recall: Arc<dyn Recall>,
}

impl Cache {
    /// Compose arbitrary halves
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMismatch` if the halves use different stores
    pub fn new(storage: Arc<dyn Storage>, recall: Arc<dyn Recall>) -> Result<Self> {
        let (storage_at, recall_at) = (storage.location(), recall.location());
        if storage_at != recall_at {
            return Err(RewindError::ConfigurationMismatch {
                storage: storage_at.to_string(),
                recall: recall_at.to_string(),
            });
        }

        Ok(Self { storage, recall })
    }

    /// Cache over a shared in-memory store
    #[must_use]
    pub fn memory(store: MemoryCacheStore, predicate: Predicate) -> Self {
        info!("Opening memory cache ({})", store.location());
        Self {
            storage: Arc::new(MemoryCacheStorage::new(store.clone(), predicate)),
            recall: Arc::new(MemoryCacheRecall::new(store)),
        }
    }

    /// Cache over a folder tree
    #[must_use]
    pub fn disk(base_dir: impl Into<PathBuf>, predicate: Predicate) -> Self {
        let base_dir = base_dir.into();
        info!("Opening disk cache at {}", base_dir.display());
        Self {
            storage: Arc::new(DiskCacheStorage::new(base_dir.clone(), predicate)),
            recall: Arc::new(DiskCacheRecall::new(base_dir)),
        }
    }

    /// Store both halves use
    pub fn location(&self) -> StoreLocation {
        self.storage.location()
    }
}

impl Recall for Cache {
    fn get(&self, request: &Request) -> Result<Option<Response>> {
        self.recall.get(request)
    }

    fn location(&self) -> StoreLocation {
        self.recall.location()
    }
}

impl Storage for Cache {
    fn set(&self, request: &Request, response: &Response) -> Result<()> {
        self.storage.set(request, response)
    }

    fn location(&self) -> StoreLocation {
        self.storage.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use tempfile::TempDir;

    fn get_users() -> Request {
        Request::new("GET", "/users")
    }

    #[test]
    fn test_memory_cache_round_trip() {
        let cache = Cache::memory(MemoryCacheStore::new(), Predicate::always());

        assert_eq!(cache.get(&get_users()).unwrap(), None);
        cache.set(&get_users(), &Response::new(200).with_body("v1")).unwrap();
        cache.set(&get_users(), &Response::new(200).with_body("v2")).unwrap();

        let recalled = cache.get(&get_users()).unwrap().unwrap();
        assert_eq!(recalled.body(), b"v2");
    }

    #[test]
    fn test_disk_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Cache::disk(temp_dir.path(), Predicate::always());

        cache.set(&get_users(), &Response::new(200).with_body("v1")).unwrap();
        cache.set(&get_users(), &Response::new(200).with_body("v2")).unwrap();

        let recalled = cache.get(&get_users()).unwrap().unwrap();
        assert_eq!(recalled.body(), b"v2");
    }

    #[test]
    fn test_shared_store_visible_to_other_views() {
        let store = MemoryCacheStore::new();
        let cache = Cache::memory(store.clone(), Predicate::always());
        let other = MemoryCacheRecall::new(store);

        cache.set(&get_users(), &Response::new(200)).unwrap();

        assert!(other.get(&get_users()).unwrap().is_some());
    }

    #[test]
    fn test_new_accepts_matching_halves() {
        let store = MemoryCacheStore::new();
        let cache = Cache::new(
            Arc::new(MemoryCacheStorage::new(store.clone(), Predicate::always())),
            Arc::new(MemoryCacheRecall::new(store.clone())),
        )
        .unwrap();

        assert_eq!(cache.location(), store.location());
    }

    #[test]
    fn test_new_rejects_different_memory_stores() {
        let result = Cache::new(
            Arc::new(MemoryCacheStorage::new(MemoryCacheStore::new(), Predicate::always())),
            Arc::new(MemoryCacheRecall::new(MemoryCacheStore::new())),
        );

        assert!(matches!(result, Err(RewindError::ConfigurationMismatch { .. })));
    }

    #[test]
    fn test_new_rejects_different_directories() {
        let result = Cache::new(
            Arc::new(DiskCacheStorage::new("a", Predicate::always())),
            Arc::new(DiskCacheRecall::new("b")),
        );

        assert!(matches!(result, Err(RewindError::ConfigurationMismatch { .. })));
    }

    #[test]
    fn test_new_accepts_equivalent_directories() {
        let cache = Cache::new(
            Arc::new(DiskCacheStorage::new("./recordings", Predicate::always())),
            Arc::new(DiskCacheRecall::new("recordings")),
        );

        assert!(cache.is_ok());
    }
}
