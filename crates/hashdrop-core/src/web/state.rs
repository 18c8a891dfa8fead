//! Application state management for the web server.
//!
//! This module provides shared state that is accessible across all HTTP
//! handlers: the file registry, the endpoint resolver and server identity.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::registry::FileRegistry;
use crate::store::FileStore;
use crate::tunnel::EndpointResolver;

use super::WebServerConfig;

/// Shared application state for all HTTP handlers.
pub struct AppState {
    /// Uploaded files by content hash
    pub registry: FileRegistry,

    /// Public URL tracking (shared with the background probe)
    pub resolver: Arc<EndpointResolver>,

    /// Server configuration
    pub config: WebServerConfig,

    /// Short identifier for this process
    pub server_id: String,

    /// When this process started serving
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state, creating the upload directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created.
    pub async fn new(config: WebServerConfig) -> Result<Self> {
        let store = FileStore::open_dir(&config.upload_dir).await?;
        let resolver = EndpointResolver::new(config.port, &config.tunnel);

        Ok(Self {
            registry: FileRegistry::new(store),
            resolver: Arc::new(resolver),
            server_id: crate::crypto::generate_server_id(),
            started_at: Utc::now(),
            config,
        })
    }

    /// Base URL for links built while answering a request with this `Host`.
    pub async fn base_url(&self, host: Option<&str>) -> String {
        self.resolver.current_base_url(host).await
    }
}

/// `<base>/download/<hash>`.
#[must_use]
pub fn download_link(base_url: &str, hash: &str) -> String {
    format!("{base_url}/download/{hash}")
}

/// `<base>/view/<hash>`.
#[must_use]
pub fn view_link(base_url: &str, hash: &str) -> String {
    format!("{base_url}/view/{hash}")
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("server_id", &self.server_id)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Type alias for shared state across handlers.
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> WebServerConfig {
        WebServerConfig {
            port: 7001,
            upload_dir: dir.path().join("uploads"),
            ..WebServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_app_state_creation() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(config(&dir)).await.unwrap();

        assert_eq!(state.server_id.len(), 8);
        assert!(dir.path().join("uploads").is_dir());
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_base_url_defaults_to_localhost() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(config(&dir)).await.unwrap();
        assert_eq!(state.base_url(None).await, "http://localhost:7001");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            download_link("https://x.ngrok.app", "ab12"),
            "https://x.ngrok.app/download/ab12"
        );
        assert_eq!(view_link("http://localhost:5000", "ab12"), "http://localhost:5000/view/ab12");
    }
}
