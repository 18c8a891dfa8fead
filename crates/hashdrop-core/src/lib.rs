//! # Hashdrop Core Library
//!
//! `hashdrop-core` provides the core functionality for Hashdrop, a
//! single-process file-sharing web server. Uploaded files are addressed by
//! the SHA-256 of their bytes and shared as links that follow the public URL
//! of a local tunnel agent whenever one is running.
//!
//! ## Modules
//!
//! - [`config`] - Configuration management
//! - [`crypto`] - Content hashing and server identity
//! - [`error`] - Error types
//! - [`registry`] - In-memory file registry keyed by content hash
//! - [`store`] - On-disk storage for uploaded bytes
//! - [`tunnel`] - Public endpoint discovery through the tunnel agent
//! - [`web`] - HTTP server, JSON API and web UI
//!
//! ## Example
//!
//! ```rust,ignore
//! use hashdrop_core::config::Config;
//! use hashdrop_core::web::{WebServer, WebServerConfig};
//!
//! let config = WebServerConfig::from_config(&Config::load()?)?;
//! WebServer::new(config).run(std::future::pending()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod registry;
pub mod store;
pub mod tunnel;

#[cfg(feature = "web")]
pub mod web;

pub use error::{Error, Result};
pub use registry::{FileRecord, FileRegistry};
pub use tunnel::{EndpointResolver, EndpointState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default directory for uploaded files, relative to the working directory
pub const DEFAULT_UPLOAD_DIR: &str = "shared_files";

/// Default request body limit (1 GiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1 << 30;

/// Default tunnel agent API base URL
pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:4040";

/// Default interval between tunnel probes in seconds
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

/// Default timeout for one tunnel probe in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

/// Host suffixes served by the tunnel agent
pub const DEFAULT_TUNNEL_DOMAINS: &[&str] = &["ngrok.io", "ngrok-free.app", "ngrok.app"];

/// Read and hash buffer size (64 KB)
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;
