//! Embedded web server for Hashdrop.
//!
//! Upload a file, get a link. The binary serves the upload page, the JSON
//! API and the file previews itself; the only optional companion is a tunnel
//! agent that makes the links reachable from outside the local network.
//!
//! ## Starting the server
//!
//! ```bash
//! hashdrop serve                  # Default port 5000
//! hashdrop serve 8000             # Custom port
//! ngrok http 5000                 # Optional: public links
//! ```
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | / | Web UI |
//! | POST | /upload | Upload a file (multipart `file` part) |
//! | GET | /view/{hash} | Preview page |
//! | GET | /download/{hash} | Download (browsers are sent to the preview page unless `?direct=1`) |
//! | GET | /preview/{hash} | Inline bytes, supports `Range` |
//! | GET | /files | All files with share links |
//! | GET | /link/{hash} | Share link for one file |
//! | GET | /status | Server identity and public URL |
//! | GET | /refresh | Probe the tunnel agent now |
//! | GET | /tunnels | What the tunnel agent reports |

pub mod assets;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod state;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, TunnelConfig};
use crate::error::{Error, Result};
use crate::tunnel::spawn_monitor;

pub use state::{AppState, SharedState};

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Address to bind
    pub bind: IpAddr,
    /// Directory holding uploaded files
    pub upload_dir: PathBuf,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
    /// Tunnel discovery settings
    pub tunnel: TunnelConfig,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            upload_dir: PathBuf::from(crate::DEFAULT_UPLOAD_DIR),
            max_upload_bytes: crate::DEFAULT_MAX_UPLOAD_BYTES,
            tunnel: TunnelConfig::default(),
        }
    }
}

impl WebServerConfig {
    /// Build the server configuration from a loaded [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the bind address does not parse.
    pub fn from_config(config: &Config) -> Result<Self> {
        let bind = config
            .server
            .bind
            .parse()
            .map_err(|e| Error::InvalidConfig {
                key: "server.bind".to_string(),
                reason: format!("{e}"),
            })?;

        Ok(Self {
            port: config.server.port,
            bind,
            upload_dir: config.server.upload_dir.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
            tunnel: config.tunnel.clone(),
        })
    }

    /// Get the bind address for the server.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Build the HTTP router over shared state.
pub fn router(state: SharedState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/upload", post(handlers::upload_file))
        .route("/view/{hash}", get(handlers::view_file))
        .route("/download/{hash}", get(handlers::download_file))
        .route("/preview/{hash}", get(handlers::preview_file))
        .route("/files", get(handlers::list_files))
        .route("/link/{hash}", get(handlers::get_link))
        .route("/status", get(handlers::get_status))
        .route("/refresh", get(handlers::refresh_tunnel))
        .route("/tunnels", get(handlers::get_tunnels))
        .fallback(assets::serve_static_fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The web server instance.
#[derive(Debug)]
pub struct WebServer {
    config: WebServerConfig,
}

impl WebServer {
    /// Create a new web server with the given configuration.
    #[must_use]
    pub const fn new(config: WebServerConfig) -> Self {
        Self { config }
    }

    /// Get the server configuration.
    #[must_use]
    pub const fn config(&self) -> &WebServerConfig {
        &self.config
    }

    /// Run until `shutdown` resolves.
    ///
    /// Creates the upload directory, starts the tunnel monitor and serves
    /// HTTP on the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created, the
    /// address cannot be bound, or the server fails.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(AppState::new(self.config.clone()).await?);

        spawn_monitor(
            Arc::clone(&state.resolver),
            self.config.tunnel.probe_interval,
        );

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("Server {} listening on {}", state.server_id, addr);
        tracing::info!("Uploads stored in {}", self.config.upload_dir.display());
        tracing::info!("Local access: {}", state.resolver.local_base_url());

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr() {
        let config = WebServerConfig::default();
        assert_eq!(config.bind_addr(), SocketAddr::from(([0, 0, 0, 0], 5000)));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.server.bind = "127.0.0.1".to_string();
        config.server.port = 8765;

        let web = WebServerConfig::from_config(&config).unwrap();
        assert_eq!(web.bind_addr(), SocketAddr::from(([127, 0, 0, 1], 8765)));
    }

    #[test]
    fn test_from_config_rejects_bad_bind() {
        let mut config = Config::default();
        config.server.bind = "not-an-ip".to_string();
        assert!(matches!(
            WebServerConfig::from_config(&config),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
