//! Error types for Hashdrop.
//!
//! This module provides a unified error type for all Hashdrop operations,
//! with specific error variants for different failure modes.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Hashdrop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Hashdrop.
#[derive(Error, Debug)]
pub enum Error {
    /// No file is registered under the given hash (E001)
    #[error("file not found: {0}")]
    NotFound(String),

    /// Upload had no file part, an empty filename, or an unusable name (E002)
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// The tunnel agent could not be queried (E003)
    #[error("tunnel agent unavailable: {0}")]
    DiscoveryUnavailable(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(_) => Some("E001"),
            Self::InvalidUpload(_) => Some("E002"),
            Self::DiscoveryUnavailable(_) => Some("E003"),
            _ => None,
        }
    }

    /// Returns whether this error is recoverable (can be retried).
    ///
    /// Only tunnel discovery is retried, and only by the next probe round.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::DiscoveryUnavailable(_))
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DiscoveryUnavailable(_) => Some(
                "Start the tunnel agent pointing at this server, for example:\n\
                   ngrok http 5000\n\
                 Links fall back to http://localhost until a tunnel is found.",
            ),
            Self::InvalidConfig { .. } | Self::ConfigError(_) => Some(
                "Check the configuration file, or reset it with:\n\
                   hashdrop config reset",
            ),
            _ => None,
        }
    }
}
