//! Common test utilities for `Hashdrop` integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use hashdrop_core::config::TunnelConfig;
use hashdrop_core::web::{AppState, SharedState, WebServerConfig};
use serde_json::{json, Value};
use tokio::sync::RwLock;

/// Port the server under test pretends to listen on.
pub const TEST_PORT: u16 = 5000;

/// Multipart boundary used by [`upload_request`].
const BOUNDARY: &str = "----hashdrop-test-boundary";

/// An agent URL nothing listens on.
pub const DEAD_AGENT: &str = "http://127.0.0.1:9";

/// Create a temporary directory for test files.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Tunnel settings pointing at `agent_url` with short timeouts.
pub fn tunnel_config(agent_url: &str) -> TunnelConfig {
    TunnelConfig {
        api_url: agent_url.to_string(),
        probe_interval: Duration::from_millis(50),
        request_timeout: Duration::from_millis(500),
        ..TunnelConfig::default()
    }
}

/// Application state storing uploads under `dir`.
pub async fn test_state(dir: &tempfile::TempDir, agent_url: &str) -> SharedState {
    let config = WebServerConfig {
        port: TEST_PORT,
        upload_dir: dir.path().join("shared_files"),
        tunnel: tunnel_config(agent_url),
        ..WebServerConfig::default()
    };
    Arc::new(AppState::new(config).await.expect("Failed to create state"))
}

/// Multipart body with one part named `field`.
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `POST /upload` with one part named `field`.
pub fn upload_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, content)))
        .expect("Failed to build upload request")
}

/// Plain `GET` request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

/// `GET` request with extra headers.
pub fn get_request_with(uri: &str, headers: &[(header::HeaderName, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    builder.body(Body::empty()).expect("Failed to build request")
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}

/// One agent tunnel entry.
pub fn tunnel_json(public_url: &str, addr: &str) -> Value {
    let proto = public_url.split("://").next().unwrap_or_default();
    json!({
        "name": "command_line",
        "public_url": public_url,
        "proto": proto,
        "config": { "addr": addr, "inspect": true }
    })
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_agent(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock agent");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// An agent that answers every listing request with `status` and `body`.
pub async fn fixed_agent(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route(
        "/api/tunnels",
        get(move || async move { (status, [(header::CONTENT_TYPE, "application/json")], body) }),
    );
    spawn_agent(app).await
}

/// An agent that accepts the request but answers only after `delay`.
pub async fn stalled_agent(delay: Duration) -> String {
    let app = Router::new().route(
        "/api/tunnels",
        get(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({ "tunnels": [] }))
        }),
    );
    spawn_agent(app).await
}

/// A stand-in tunnel agent whose listing can be changed while it runs.
pub struct MockAgent {
    /// Base URL to configure as `tunnel.api_url`
    pub url: String,
    listing: Arc<RwLock<Value>>,
}

impl MockAgent {
    /// Serve `tunnels` at `/api/tunnels` on an ephemeral local port.
    pub async fn start(tunnels: Vec<Value>) -> Self {
        let listing = Arc::new(RwLock::new(json!({ "tunnels": tunnels, "uri": "/api/tunnels" })));

        let shared = Arc::clone(&listing);
        let app = Router::new().route(
            "/api/tunnels",
            get(move || {
                let shared = Arc::clone(&shared);
                async move { Json(shared.read().await.clone()) }
            }),
        );

        Self {
            url: spawn_agent(app).await,
            listing,
        }
    }

    /// Replace the tunnels the agent reports.
    pub async fn set_tunnels(&self, tunnels: Vec<Value>) {
        *self.listing.write().await = json!({ "tunnels": tunnels, "uri": "/api/tunnels" });
    }
}
