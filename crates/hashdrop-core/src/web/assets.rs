//! Static file serving using rust-embed.
//!
//! The upload page and its scripts are compiled into the binary, so a
//! single executable is all a user needs to start sharing.

use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

/// Embedded static assets for the web UI.
#[derive(RustEmbed)]
#[folder = "src/web/assets/"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
#[include = "*.ico"]
#[include = "*.svg"]
pub struct Assets;

/// Serve a static file for any path no route matched.
///
/// Extensionless paths get the upload page.
pub async fn serve_static_fallback(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    let path = if path.is_empty() || !path.contains('.') {
        "index.html"
    } else {
        path
    };

    serve_file(path)
}

fn serve_file(path: &str) -> Response {
    let Some(content) = Assets::get(path) else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            "Not Found",
        )
            .into_response();
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CACHE_CONTROL, cache_control_for(path).to_string()),
        ],
        content.data.into_owned(),
    )
        .into_response()
}

fn has_extension(path: &str, ext: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn cache_control_for(path: &str) -> &'static str {
    if has_extension(path, "html") {
        "no-cache, no-store, must-revalidate"
    } else if has_extension(path, "js") || has_extension(path, "css") {
        "public, max-age=3600"
    } else {
        "public, max-age=86400"
    }
}
