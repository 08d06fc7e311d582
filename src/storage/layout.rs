//! On-disk layout shared by the disk backends
//!
//! ```text
//! <base>/<path segments>/<fingerprint segments>/request.txt   cache
//! <base>/<path segments>/<fingerprint segments>/response.txt
//! <base>/<id>/request.txt                                     queue
//! <base>/<id>/response.txt
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::fingerprint::Fingerprint;
use crate::message::{Message, Request};
use crate::replay::ReplayOrder;
use crate::{Result, RewindError};

/// File holding the request half of a record
pub const REQUEST_FILE: &str = "request.txt";

/// File holding the response half of a record
pub const RESPONSE_FILE: &str = "response.txt";

/// Folder a cache backend uses for a request
///
/// Organized by the request path so recordings stay browsable, then keyed by
/// the encoded fingerprint. Empty path segments are dropped, so `/a` and
/// `//a` share the `a` prefix; their fingerprint folders still differ.
pub fn cache_folder(base_dir: &Path, request: &Request) -> PathBuf {
    let mut folder = base_dir.to_path_buf();

    for segment in request.path().split('/').filter(|s| !s.is_empty()) {
        folder.push(escape_segment(segment));
    }
    for segment in Fingerprint::of(request).segments() {
        folder.push(segment);
    }

    folder
}

/// Make a URL path segment safe to use as a single folder name
fn escape_segment(segment: &str) -> String {
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        other => urlencoding::encode(other).into_owned(),
    }
}

/// Validate a queue id before using it as a folder name
///
/// # Errors
///
/// Returns `ConfigError` if the id is empty, a dot name, or contains a separator
pub fn validate_queue_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(RewindError::ConfigError(format!("Invalid queue id: {id:?}")));
    }

    if id.contains(['/', '\\', '\0']) {
        return Err(RewindError::ConfigError(format!(
            "Queue id cannot contain separators: {id:?}"
        )));
    }

    Ok(())
}

/// Write one half of a record into `folder`, creating it as needed
///
/// The content goes to a temporary file that is then renamed over `file`,
/// so a concurrent reader sees either the old message or the new one.
///
/// # Errors
///
/// Returns `InvalidMessage` if the message cannot be stored unchanged, or an
/// error if the folder or file cannot be written
pub fn write_message(folder: &Path, file: &str, message: &dyn Message) -> Result<()> {
    message.validate()?;
    fs::create_dir_all(folder)?;

    let tmp_path = folder.join(format!(".{file}.{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp_path, message.to_bytes())?;
    if let Err(e) = fs::rename(&tmp_path, folder.join(file)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Read a message file, treating a missing file as absent
///
/// # Errors
///
/// Returns `CorruptRecord` if the file exists but does not parse, or an I/O
/// error for any other read failure
pub fn read_message<M: Message>(path: &Path) -> Result<Option<M>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    M::parse(&data).map(Some).map_err(|e| RewindError::CorruptRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read a message file that must be present
///
/// # Errors
///
/// Returns `CorruptRecord` if the file is missing or does not parse
pub fn read_required<M: Message>(folder: &Path, file: &str) -> Result<M> {
    let path = folder.join(file);
    read_message(&path)?.ok_or_else(|| RewindError::CorruptRecord {
        path,
        reason: format!("missing {file}"),
    })
}

/// Record folders directly under `base_dir`
///
/// A base directory that does not exist holds no records.
///
/// # Errors
///
/// Returns error if the directory cannot be listed
pub fn record_folders(base_dir: &Path, order: ReplayOrder) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            folders.push(entry.path());
        }
    }

    if order == ReplayOrder::Sorted {
        folders.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Response;
    use tempfile::TempDir;

    #[test]
    fn test_cache_folder_layout() {
        let request = Request::new("GET", "/api/users/7?expand=true");
        let folder = cache_folder(Path::new("/base"), &request);

        let expected = Path::new("/base/api/users/7").join(Fingerprint::of(&request).encode());
        assert_eq!(folder, expected);
    }

    #[test]
    fn test_cache_folder_deterministic() {
        let request = Request::new("GET", "/a").with_header("Accept", "*/*");
        assert_eq!(
            cache_folder(Path::new("base"), &request),
            cache_folder(Path::new("base"), &request.clone())
        );
    }

    #[test]
    fn test_cache_folder_escapes_traversal() {
        let request = Request::new("GET", "/../../etc/./passwd");
        let folder = cache_folder(Path::new("/base"), &request);

        assert!(folder.starts_with("/base/%2E%2E/%2E%2E/etc/%2E/passwd"));
        assert!(!folder
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir)));
    }

    #[test]
    fn test_cache_folder_root_path() {
        let request = Request::new("GET", "/");
        let folder = cache_folder(Path::new("/base"), &request);

        assert_eq!(folder, Path::new("/base").join(Fingerprint::of(&request).encode()));
    }

    #[test]
    fn test_cache_folder_empty_segments() {
        let single = Request::new("GET", "/a");
        let double = Request::new("GET", "//a");

        let single_folder = cache_folder(Path::new("/base"), &single);
        let double_folder = cache_folder(Path::new("/base"), &double);

        assert!(single_folder.starts_with("/base/a"));
        assert!(double_folder.starts_with("/base/a"));
        assert_ne!(single_folder, double_folder);
    }

    #[test]
    fn test_write_message_replaces_file() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("entry");

        write_message(&folder, RESPONSE_FILE, &Response::new(200).with_body("old")).unwrap();
        write_message(&folder, RESPONSE_FILE, &Response::new(201).with_body("new")).unwrap();

        let read: Response = read_required(&folder, RESPONSE_FILE).unwrap();
        assert_eq!(read.status(), 201);
        assert_eq!(fs::read_dir(&folder).unwrap().count(), 1);
    }

    #[test]
    fn test_write_message_rejects_unrepresentable() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("entry");
        let response = Response::new(200).with_reason("OK\r\n\r\nbody");

        let result = write_message(&folder, RESPONSE_FILE, &response);

        assert!(matches!(result, Err(RewindError::InvalidMessage(_))));
        assert!(!folder.exists());
    }

    #[test]
    fn test_validate_queue_id() {
        assert!(validate_queue_id("00001abc").is_ok());
        assert!(validate_queue_id("").is_err());
        assert!(validate_queue_id("..").is_err());
        assert!(validate_queue_id("a/b").is_err());
        assert!(validate_queue_id("a\\b").is_err());
    }

    #[test]
    fn test_read_missing_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let read: Option<Response> = read_message(&temp_dir.path().join("nope.txt")).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_read_corrupt_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(RESPONSE_FILE);
        fs::write(&path, b"garbage").unwrap();

        let result = read_message::<Response>(&path);
        assert!(matches!(result, Err(RewindError::CorruptRecord { .. })));
    }

    #[test]
    fn test_read_required_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_required::<Request>(temp_dir.path(), REQUEST_FILE);

        match result {
            Err(RewindError::CorruptRecord { reason, .. }) => {
                assert!(reason.contains(REQUEST_FILE));
            }
            other => panic!("expected corrupt record, got {other:?}"),
        }
    }

    #[test]
    fn test_record_folders_sorted() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["c", "a", "b"] {
            fs::create_dir(temp_dir.path().join(name)).unwrap();
        }
        fs::write(temp_dir.path().join("stray.txt"), b"not a record").unwrap();

        let folders = record_folders(temp_dir.path(), ReplayOrder::Sorted).unwrap();
        let names: Vec<_> = folders
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_record_folders_missing_base() {
        let temp_dir = TempDir::new().unwrap();
        let folders =
            record_folders(&temp_dir.path().join("absent"), ReplayOrder::Listing).unwrap();
        assert!(folders.is_empty());
    }
}
