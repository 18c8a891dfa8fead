//! Hashing helpers for Hashdrop.
//!
//! This module provides:
//! - SHA-256 content hashing, one-shot and incremental
//! - Lowercase hex encoding of digests
//! - Server identity generation

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Compute SHA-256 hash of data.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 of data and hex-encode it.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    to_hex(&sha256(data))
}

/// Lowercase hex encoding.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

/// Check whether a string looks like a content hash (64 lowercase hex chars).
#[must_use]
pub fn is_content_hash(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Incremental SHA-256 over a stream of chunks.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
    bytes: u64,
}

impl ContentHasher {
    /// Create an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes hashed so far.
    #[must_use]
    pub const fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    /// Finish and return the hex digest.
    #[must_use]
    pub fn finalize_hex(self) -> String {
        to_hex(&self.inner.finalize())
    }
}

/// Generate a short server identifier.
///
/// Eight hex characters derived from the hostname and the current time,
/// so each process start gets a fresh id.
#[must_use]
pub fn generate_server_id() -> String {
    let host = hostname::get().map_or_else(
        |_| "hashdrop".to_string(),
        |h| h.to_string_lossy().into_owned(),
    );
    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut id = sha256_hex(format!("{host}{now}").as_bytes());
    id.truncate(8);
    id
}
