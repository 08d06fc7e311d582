//! Request fingerprinting for deterministic lookup keys
//!
//! A fingerprint is the request's canonical bytes. Two requests that
//! serialize identically share a fingerprint, and therefore share whatever
//! response was stored for either of them.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

use crate::message::{Message, Request};
use crate::{Result, RewindError};

/// Maximum length of one folder name produced by [`Fingerprint::segments`]
pub const SEGMENT_LEN_MAX: usize = 128;

/// Deterministic identity of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Compute the fingerprint of a request
    #[must_use]
    pub fn of(request: &Request) -> Self {
        Self(request.to_bytes())
    }

    /// Raw canonical bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reversible, filename-safe text form
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    /// Inverse of [`Fingerprint::encode`]
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the text is not valid URL-safe base64
    pub fn decode(encoded: &str) -> Result<Self> {
        URL_SAFE_NO_PAD
            .decode(encoded)
            .map(Self)
            .map_err(|e| RewindError::InvalidMessage(format!("Invalid fingerprint encoding: {e}")))
    }

    /// Encoded form split into folder names no longer than
    /// [`SEGMENT_LEN_MAX`], so long requests stay under filesystem name limits
    #[must_use]
    pub fn segments(&self) -> Vec<String> {
        let encoded = self.encode();
        if encoded.is_empty() {
            return vec![String::new()];
        }

        // base64 output is ASCII, so byte chunks are char boundaries
        encoded
            .as_bytes()
            .chunks(SEGMENT_LEN_MAX)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }

    /// Rebuild the request this fingerprint was taken from
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the bytes are not a canonical request
    pub fn to_request(&self) -> Result<Request> {
        Request::parse(&self.0)
    }

    /// SHA-256 of the canonical bytes
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(&self.0).into()
    }

    /// Short hex digest for log lines
    #[must_use]
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest()[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_hex())
    }
}
