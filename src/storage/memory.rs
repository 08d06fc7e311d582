//! In-memory backing stores and their storage views

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use tracing::debug;

use super::{admit, Record, Storage, StoreLocation};
use crate::fingerprint::Fingerprint;
use crate::message::{Request, Response};
use crate::predicate::Predicate;
use crate::Result;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

fn next_store_id() -> u64 {
    NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Keyed store: one response per fingerprint
///
/// Clones are handles to the same store.
#[derive(Debug, Clone)]
pub struct MemoryCacheStore {
    id: u64,
    entries: Arc<DashMap<Fingerprint, Response>>,
}

impl MemoryCacheStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_store_id(),
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Response stored under a fingerprint
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Response> {
        self.entries.get(fingerprint).map(|entry| entry.value().clone())
    }

    /// Store a response, returning the one it replaced
    pub fn insert(&self, fingerprint: Fingerprint, response: Response) -> Option<Response> {
        self.entries.insert(fingerprint, response)
    }

    /// Number of stored responses
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identity of this store
    #[must_use]
    pub fn location(&self) -> StoreLocation {
        StoreLocation::Memory(self.id)
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only ordered log of records
///
/// Clones are handles to the same log.
#[derive(Debug, Clone)]
pub struct MemoryQueueStore {
    id: u64,
    records: Arc<RwLock<Vec<Record>>>,
}

impl MemoryQueueStore {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_store_id(),
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a record
    pub fn append(&self, record: Record) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Record at a position in insertion order
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Record> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    /// Copy of the whole log as it is now
    ///
    /// Taken under a single read lock; later appends do not show up in it.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of this store
    #[must_use]
    pub fn location(&self) -> StoreLocation {
        StoreLocation::Memory(self.id)
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage writing into a [`MemoryCacheStore`]; last write per fingerprint wins
#[derive(Debug, Clone)]
pub struct MemoryCacheStorage {
    store: MemoryCacheStore,
    predicate: Predicate,
}

impl MemoryCacheStorage {
    /// Create a storage view over a store
    #[must_use]
    pub fn new(store: MemoryCacheStore, predicate: Predicate) -> Self {
        Self { store, predicate }
    }
}

impl Storage for MemoryCacheStorage {
    fn set(&self, request: &Request, response: &Response) -> Result<()> {
        let fingerprint = Fingerprint::of(request);

        if !admit(&self.predicate, request, response)? {
            debug!("Skipped memory cache entry: {}", fingerprint);
            return Ok(());
        }

        debug!(
            "Cached in memory: {} {} -> {} ({})",
            request.method(),
            request.uri(),
            response.status(),
            fingerprint
        );
        self.store.insert(fingerprint, response.clone());

        Ok(())
    }

    fn location(&self) -> StoreLocation {
        self.store.location()
    }
}

/// Storage appending to a [`MemoryQueueStore`]; duplicates are kept
#[derive(Debug, Clone)]
pub struct MemoryQueueStorage {
    store: MemoryQueueStore,
    predicate: Predicate,
}

impl MemoryQueueStorage {
    /// Create a storage view over a log
    #[must_use]
    pub fn new(store: MemoryQueueStore, predicate: Predicate) -> Self {
        Self { store, predicate }
    }
}

impl Storage for MemoryQueueStorage {
    fn set(&self, request: &Request, response: &Response) -> Result<()> {
        if !admit(&self.predicate, request, response)? {
            debug!("Skipped memory queue entry: {} {}", request.method(), request.uri());
            return Ok(());
        }

        self.store
            .append(Record::new(request.clone(), response.clone()));
        debug!(
            "Queued in memory: {} {} -> {} (count: {})",
            request.method(),
            request.uri(),
            response.status(),
            self.store.len()
        );

        Ok(())
    }

    fn location(&self) -> StoreLocation {
        self.store.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use std::thread;

    fn get_users() -> Request {
        Request::new("GET", "/users")
    }

    #[test]
    fn test_store_ids_distinct() {
        assert_ne!(MemoryCacheStore::new().location(), MemoryCacheStore::new().location());
        assert_ne!(MemoryQueueStore::new().location(), MemoryCacheStore::new().location());

        let store = MemoryCacheStore::new();
        assert_eq!(store.clone().location(), store.location());
    }

    #[test]
    fn test_cache_last_write_wins() {
        let store = MemoryCacheStore::new();
        let storage = MemoryCacheStorage::new(store.clone(), Predicate::always());

        storage.set(&get_users(), &Response::new(200).with_body("first")).unwrap();
        storage.set(&get_users(), &Response::new(200).with_body("second")).unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get(&Fingerprint::of(&get_users())).unwrap();
        assert_eq!(stored.body(), b"second");
    }

    #[test]
    fn test_cache_predicate_rejects_both() {
        let store = MemoryCacheStore::new();
        let storage = MemoryCacheStorage::new(store.clone(), Predicate::never());

        storage.set(&get_users(), &Response::new(200)).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_cache_stores_when_either_side_accepted() {
        let store = MemoryCacheStore::new();
        let only_requests = Predicate::new(|m| m.as_request().is_some());
        let storage = MemoryCacheStorage::new(store.clone(), only_requests);

        storage.set(&get_users(), &Response::new(500)).unwrap();

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_queue_keeps_duplicates_in_order() {
        let store = MemoryQueueStore::new();
        let storage = MemoryQueueStorage::new(store.clone(), Predicate::always());

        storage.set(&get_users(), &Response::new(200).with_body("1")).unwrap();
        storage.set(&get_users(), &Response::new(200).with_body("2")).unwrap();

        let bodies: Vec<Vec<u8>> = store
            .snapshot()
            .iter()
            .map(|r| r.response.body().to_vec())
            .collect();
        assert_eq!(bodies, [b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn test_queue_predicate_rejects_both() {
        let store = MemoryQueueStore::new();
        let storage = MemoryQueueStorage::new(store.clone(), Predicate::never());

        storage.set(&get_users(), &Response::new(200)).unwrap();

        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_unrepresentable_pair_rejected() {
        let store = MemoryQueueStore::new();
        let storage = MemoryQueueStorage::new(store.clone(), Predicate::always());
        let response = Response::new(200).with_header("X", "v\r\n\r\ninjected");

        let result = storage.set(&get_users(), &response);

        assert!(matches!(result, Err(crate::RewindError::InvalidMessage(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_ignores_later_appends() {
        let store = MemoryQueueStore::new();
        store.append(Record::new(get_users(), Response::new(200)));

        let snapshot = store.snapshot();
        store.append(Record::new(get_users(), Response::new(201)));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).map(|r| r.response.status()), Some(201));
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_queue_concurrent_appends() {
        let store = MemoryQueueStore::new();
        let storage = MemoryQueueStorage::new(store.clone(), Predicate::always());

        thread::scope(|scope| {
            for worker in 0..8 {
                let storage = &storage;
                scope.spawn(move || {
                    for i in 0..50 {
                        let request = Request::new("GET", format!("/w{worker}/{i}"));
                        storage.set(&request, &Response::new(200)).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.len(), 400);
    }

    #[test]
    fn test_cache_concurrent_inserts() {
        let store = MemoryCacheStore::new();
        let storage = MemoryCacheStorage::new(store.clone(), Predicate::always());

        thread::scope(|scope| {
            for worker in 0..8 {
                let storage = &storage;
                scope.spawn(move || {
                    for i in 0..50 {
                        let request = Request::new("GET", format!("/w{worker}/{i}"));
                        storage.set(&request, &Response::new(200)).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.len(), 400);
    }
}
