//! Persisting request/response pairs

mod disk;
pub mod layout;
mod memory;

use std::fmt;
use std::path::{Component, Path, PathBuf};

pub use disk::{DiskCacheStorage, DiskQueueStorage};
pub use memory::{MemoryCacheStorage, MemoryCacheStore, MemoryQueueStorage, MemoryQueueStore};

use crate::fingerprint::Fingerprint;
use crate::message::{Message, Request, Response};
use crate::predicate::Predicate;
use crate::Result;

/// One captured interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Request that was sent
    pub request: Request,
    /// Response it produced
    pub response: Response,
}

impl Record {
    /// Pair a request with its response
    #[must_use]
    pub fn new(request: Request, response: Response) -> Self {
        Self { request, response }
    }

    /// Fingerprint of the request half
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.request)
    }
}

/// Identity of a backing store
///
/// Two views observe each other's writes only if their locations are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Process-local store, by instance id
    Memory(u64),
    /// Folder tree under a base directory
    Disk(PathBuf),
}

impl StoreLocation {
    /// Location of a disk store, lexically normalized so `./x` and `x` agree
    pub fn disk(base_dir: &Path) -> Self {
        let normalized: PathBuf = base_dir
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();

        if normalized.as_os_str().is_empty() {
            Self::Disk(PathBuf::from("."))
        } else {
            Self::Disk(normalized)
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(id) => write!(f, "memory store #{id}"),
            Self::Disk(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Persists request/response pairs
///
/// Implementations consult their predicate once for the request and once for
/// the response. The whole pair is stored when either side is accepted, and
/// the store is left untouched when both reject.
pub trait Storage: Send + Sync {
    /// Store a pair
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if an accepted pair cannot be stored without
    /// changing it, or an error if the backing store cannot be written
    fn set(&self, request: &Request, response: &Response) -> Result<()>;

    /// Store this storage writes to
    fn location(&self) -> StoreLocation;
}

/// Whether a pair should be stored, checking it can be stored faithfully
fn admit(predicate: &Predicate, request: &Request, response: &Response) -> Result<bool> {
    if !(predicate.test(request) || predicate.test(response)) {
        return Ok(false);
    }

    request.validate()?;
    response.validate()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_location_normalized() {
        assert_eq!(
            StoreLocation::disk(Path::new("./recordings")),
            StoreLocation::disk(Path::new("recordings"))
        );
        assert_eq!(
            StoreLocation::disk(Path::new("a//b/")),
            StoreLocation::disk(Path::new("a/b"))
        );
        assert_eq!(
            StoreLocation::disk(Path::new(".")),
            StoreLocation::Disk(PathBuf::from("."))
        );
        assert_ne!(
            StoreLocation::disk(Path::new("a")),
            StoreLocation::disk(Path::new("b"))
        );
    }

    #[test]
    fn test_admit_either_side() {
        let only_requests = Predicate::new(|m| m.as_request().is_some());
        let request = Request::new("GET", "/x");
        let response = Response::new(500);

        assert!(admit(&only_requests, &request, &response).unwrap());
        assert!(admit(&Predicate::always(), &request, &response).unwrap());
        assert!(!admit(&Predicate::never(), &request, &response).unwrap());
    }

    #[test]
    fn test_admit_rejects_unrepresentable_pair() {
        let request = Request::new("GET", "/a b");
        let response = Response::new(200);

        assert!(matches!(
            admit(&Predicate::always(), &request, &response),
            Err(crate::RewindError::InvalidMessage(_))
        ));
        // Nothing to store, so nothing to check
        assert!(!admit(&Predicate::never(), &request, &response).unwrap());
    }

    #[test]
    fn test_record_fingerprint() {
        let record = Record::new(Request::new("GET", "/x"), Response::new(200));
        assert_eq!(record.fingerprint(), Fingerprint::of(&Request::new("GET", "/x")));
    }
}
