//! Error types for Rewind

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for Rewind operations
pub type Result<T> = std::result::Result<T, RewindError>;

/// Errors that can occur in Rewind
#[derive(Debug, Error)]
pub enum RewindError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored record exists but cannot be read back
    #[error("Corrupt record at {}: {reason}", path.display())]
    CorruptRecord {
        /// File or folder that failed to load
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Message text is not in canonical form
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Storage and recall halves of a cache point at different stores
    #[error("Cache halves use different stores: storage at {storage}, recall at {recall}")]
    ConfigurationMismatch {
        /// Store the storage half writes to
        storage: String,
        /// Store the recall half reads from
        recall: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No recorded responses left to serve
    #[error("Recorded responses exhausted")]
    Exhausted,

    /// Upstream call failed
    #[error("Upstream call failed: {0}")]
    Upstream(String),
}
