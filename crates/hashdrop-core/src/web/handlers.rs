//! HTTP endpoint handlers for the Hashdrop web interface.
//!
//! This module contains all the handler functions for the routes listed in
//! [`super`].

#![allow(clippy::missing_errors_doc)]

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::multipart::{Field, Multipart, MultipartError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::registry::FileRecord;
use crate::store::{sanitize_filename, StoredFile};
use crate::tunnel::AgentReport;

use super::error::{ApiError, ApiResult};
use super::pages::{not_found_page, view_page};
use super::state::{download_link, view_link, SharedState};

/// User-Agent fragments that mark an interactive browser.
const BROWSER_MARKERS: &[&str] = &["mozilla", "chrome", "safari", "edge", "firefox"];

/// Multipart part carrying the upload.
const FILE_FIELD: &str = "file";

// ============================================================================
// Response types
// ============================================================================

/// Upload response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    message: String,
    file_hash: String,
    filename: String,
    share_link: String,
    public_url: Option<String>,
}

/// One row of `GET /files`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    hash: String,
    filename: String,
    size: u64,
    download_count: u64,
    uploaded_at: DateTime<Utc>,
    share_link: String,
}

/// Status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    server_id: String,
    version: &'static str,
    port: u16,
    public_url: Option<String>,
    tunnel_active: bool,
    file_count: usize,
    started_at: DateTime<Utc>,
    uptime_secs: i64,
}

/// Forced probe response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    old_url: Option<String>,
    new_url: Option<String>,
    tunnel_active: bool,
    message: String,
}

/// Whether a link points through a tunnel or at the local address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Through the tunnel
    Public,
    /// `http://localhost:<port>`
    Local,
}

/// Share links for one file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    file_hash: String,
    filename: String,
    download_link: String,
    view_link: String,
    base_url: String,
    tunnel_active: bool,
    link_type: LinkType,
}

/// Tunnel agent diagnostics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelsResponse {
    #[serde(flatten)]
    report: AgentReport,
    public_url: Option<String>,
    port: u16,
}

// ============================================================================
// Request types
// ============================================================================

/// Query string accepted by `GET /download/{hash}`.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Any non-empty value skips the browser redirect
    direct: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

fn host_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|h| h.to_str().ok())
}

/// Whether a User-Agent looks like an interactive browser.
#[must_use]
pub fn is_browser(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    BROWSER_MARKERS.iter().any(|marker| ua.contains(marker))
}

fn multipart_error(e: &MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Upload exceeds the size limit")
    } else {
        ApiError::bad_request("Failed to read upload").with_details(e.body_text())
    }
}

/// Stream one multipart part into the store, hashing as it goes.
async fn store_field(state: &SharedState, mut field: Field, name: &str) -> ApiResult<StoredFile> {
    let mut writer = state.registry.store().writer(name).await?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(
                    "Upload of {} aborted after {} bytes: {}",
                    name,
                    writer.bytes_written(),
                    e
                );
                writer.abort().await;
                return Err(multipart_error(&e));
            }
        };

        if let Err(e) = writer.write_chunk(&chunk).await {
            tracing::error!(
                "Failed to store {} after {} bytes: {}",
                name,
                writer.bytes_written(),
                e
            );
            writer.abort().await;
            return Err(e.into());
        }
    }

    Ok(writer.finish().await?)
}

// ============================================================================
// Upload
// ============================================================================

/// POST /upload - Store a file and return its share link.
pub async fn upload_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(ApiError::bad_request("No file selected"));
        }
        let name = sanitize_filename(&original)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid file name '{original}'")))?;

        let stored = store_field(&state, field, &name).await?;
        let record = state.registry.register_stored(stored, &name).await;

        let base = state.base_url(host_header(&headers)).await;
        let public_url = state.resolver.public_url().await;

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            share_link: download_link(&base, &record.content_hash),
            file_hash: record.content_hash,
            filename: record.display_name,
            public_url,
        }));
    }

    Err(ApiError::bad_request("No file part in the request"))
}

// ============================================================================
// File access
// ============================================================================

/// GET /view/{hash} - HTML preview page.
pub async fn view_file(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
) -> Response {
    match state.registry.lookup(&hash).await {
        Ok(record) => {
            let base = state.base_url(host_header(&headers)).await;
            let public = state.resolver.is_public().await;
            Html(view_page(&record, &base, public)).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, Html(not_found_page())).into_response(),
    }
}

/// GET /download/{hash} - Stream the file as an attachment.
///
/// Browsers land on the preview page instead unless `?direct` is set.
pub async fn download_file(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
    Query(query): Query<DownloadQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let direct = query.direct.is_some_and(|d| !d.is_empty());
    let from_browser = headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .is_some_and(is_browser);

    if from_browser && !direct {
        return Ok(Redirect::to(&format!("/view/{hash}")).into_response());
    }

    let record = state.registry.lookup(&hash).await?;
    let file = state
        .registry
        .store()
        .open(&record.storage_location)
        .await
        .map_err(|e| {
            tracing::error!(
                "Stored file for {} is unreadable: {}",
                record.content_hash,
                e
            );
            ApiError::not_found("File not found")
        })?;
    let size = file.metadata().await?.len();

    let record = state.registry.record_download(&hash).await?;
    tracing::info!(
        "Download of {} ({}), {} so far",
        record.display_name,
        record.content_hash,
        record.download_count
    );

    let mime = mime_guess::from_path(&record.display_name).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", record.display_name),
            ),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        body,
    )
        .into_response())
}

/// GET /preview/{hash} - Inline bytes with `Range` support.
pub async fn preview_file(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let record = state.registry.lookup(&hash).await?;

    let response = ServeFile::new(&record.storage_location)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    if response.status() == StatusCode::NOT_FOUND {
        tracing::error!(
            "Stored file for {} is missing: {}",
            record.content_hash,
            record.storage_location.display()
        );
        return Err(ApiError::not_found("File not found"));
    }

    Ok(response.map(Body::new))
}

// ============================================================================
// Listing & links
// ============================================================================

fn file_entry(record: FileRecord, base: &str) -> FileEntry {
    FileEntry {
        share_link: download_link(base, &record.content_hash),
        hash: record.content_hash,
        filename: record.display_name,
        size: record.size_bytes,
        download_count: record.download_count,
        uploaded_at: record.uploaded_at,
    }
}

/// GET /files - Every file with its share link.
pub async fn list_files(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Json<Vec<FileEntry>> {
    let base = state.base_url(host_header(&headers)).await;
    let files = state
        .registry
        .list()
        .await
        .into_iter()
        .map(|record| file_entry(record, &base))
        .collect();
    Json(files)
}

/// GET /link/{hash} - Share links for one file.
pub async fn get_link(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<LinkResponse>> {
    let record = state.registry.lookup(&hash).await?;
    let base = state.base_url(host_header(&headers)).await;
    let tunnel_active = state.resolver.is_public().await;

    Ok(Json(LinkResponse {
        download_link: download_link(&base, &record.content_hash),
        view_link: view_link(&base, &record.content_hash),
        file_hash: record.content_hash,
        filename: record.display_name,
        base_url: base,
        tunnel_active,
        link_type: if tunnel_active {
            LinkType::Public
        } else {
            LinkType::Local
        },
    }))
}

// ============================================================================
// Server & tunnel
// ============================================================================

/// GET /status - Server identity and public reachability.
pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let public_url = state.resolver.public_url().await;

    Json(StatusResponse {
        server_id: state.server_id.clone(),
        version: crate::VERSION,
        port: state.config.port,
        tunnel_active: public_url.is_some(),
        public_url,
        file_count: state.registry.len().await,
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /refresh - Probe the tunnel agent now.
pub async fn refresh_tunnel(State(state): State<SharedState>) -> Json<RefreshResponse> {
    let refresh = state.resolver.refresh().await;

    let message = match &refresh.new_url {
        Some(url) => format!("Tunnel active at {url}"),
        None => "No tunnel found, links use the local address".to_string(),
    };

    Json(RefreshResponse {
        tunnel_active: refresh.new_url.is_some(),
        old_url: refresh.old_url,
        new_url: refresh.new_url,
        message,
    })
}

/// GET /tunnels - What the tunnel agent reports, verbatim.
pub async fn get_tunnels(State(state): State<SharedState>) -> Json<TunnelsResponse> {
    let report = state.resolver.inspect().await;

    Json(TunnelsResponse {
        report,
        public_url: state.resolver.public_url().await,
        port: state.resolver.port(),
    })
}
