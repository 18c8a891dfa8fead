//! Server-rendered HTML pages: file preview and "not found".

use std::fmt::Write;

use crate::registry::FileRecord;
use crate::store::format_size;

use super::state::{download_link, view_link};

/// How the preview page shows a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// `<img>`
    Image,
    /// `<video>`
    Video,
    /// `<audio>`
    Audio,
    /// Download prompt
    Pdf,
    /// Text fetched into a `<pre>`
    Text,
    /// Download prompt
    Other,
}

impl PreviewKind {
    /// Classify a filename by extension.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let ext = extension(name).to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => Self::Image,
            "mp4" | "webm" | "ogg" | "avi" | "mov" => Self::Video,
            "mp3" | "wav" | "m4a" => Self::Audio,
            "pdf" => Self::Pdf,
            "txt" | "md" | "py" | "js" | "html" | "css" | "json" | "xml" => Self::Text,
            _ => Self::Other,
        }
    }
}

fn extension(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

/// Escape text for HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn preview_block(record: &FileRecord) -> String {
    let hash = &record.content_hash;
    let name = escape_html(&record.display_name);
    let ext = escape_html(&extension(&record.display_name).to_ascii_lowercase());

    match PreviewKind::from_name(&record.display_name) {
        PreviewKind::Image => format!(r#"<img src="/preview/{hash}" alt="{name}">"#),
        PreviewKind::Video => format!(
            r#"<video controls><source src="/preview/{hash}" type="video/{ext}">Your browser cannot play this video.</video>"#
        ),
        PreviewKind::Audio => format!(
            r#"<audio controls><source src="/preview/{hash}" type="audio/{ext}">Your browser cannot play this audio.</audio>"#
        ),
        PreviewKind::Pdf => {
            r#"<div class="unsupported"><h3>PDF document</h3><p>Download the file to read it.</p></div>"#
                .to_string()
        }
        PreviewKind::Text => format!(
            r#"<pre id="text-preview" data-src="/preview/{hash}">Loading…</pre>"#
        ),
        PreviewKind::Other => format!(
            r#"<div class="unsupported"><h3>{} file</h3><p>No preview available for this type.</p></div>"#,
            if ext.is_empty() { "Binary".to_string() } else { ext.to_ascii_uppercase() }
        ),
    }
}

/// Render the preview page for one file.
#[must_use]
pub fn view_page(record: &FileRecord, base_url: &str, public: bool) -> String {
    let hash = &record.content_hash;
    let name = escape_html(&record.display_name);
    let view = escape_html(&view_link(base_url, hash));
    let download = escape_html(&download_link(base_url, hash));
    let link_kind = if public { "Public" } else { "Local" };

    let mut page = String::with_capacity(4096);
    let _ = write!(
        page,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{name} - Hashdrop</title>
<link rel="stylesheet" href="/style.css">
</head>
<body>
<main class="container">
<header class="header"><h1>{name}</h1></header>
<section class="file-info">
<div class="info-item"><strong>Size</strong><span>{size}</span></div>
<div class="info-item"><strong>Downloads</strong><span>{downloads}</span></div>
<div class="info-item"><strong>Uploaded</strong><span>{uploaded}</span></div>
<div class="info-item"><strong>Hash</strong><span title="{hash}">{short}…</span></div>
</section>
<section class="preview-area">{preview}</section>
<section class="actions">
<a class="btn btn-download" href="/download/{hash}?direct=1">Download</a>
<button class="btn btn-copy" data-link="{view}">Copy {link_kind} view link</button>
<button class="btn btn-copy" data-link="{download}">Copy {link_kind} download link</button>
<a class="btn btn-back" href="/">Back</a>
</section>
</main>
<script src="/view.js"></script>
</body>
</html>
"#,
        size = format_size(record.size_bytes),
        downloads = record.download_count,
        uploaded = record.uploaded_at.format("%Y-%m-%d %H:%M UTC"),
        short = &hash[..hash.len().min(16)],
        preview = preview_block(record),
    );
    page
}

/// Render the page shown for an unknown hash.
#[must_use]
pub fn not_found_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>File not found - Hashdrop</title>
<link rel="stylesheet" href="/style.css">
</head>
<body>
<main class="error-container">
<h1 class="error-title">File not found</h1>
<p class="error-message">The file you are looking for is not on this server.</p>
<a class="btn btn-back" href="/">Back to start</a>
</main>
</body>
</html>
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn record(name: &str) -> FileRecord {
        FileRecord {
            content_hash: crate::crypto::sha256_hex(name.as_bytes()),
            display_name: name.to_string(),
            storage_location: PathBuf::from(name),
            size_bytes: 2048,
            uploaded_at: Utc::now(),
            download_count: 4,
        }
    }

    #[test]
    fn test_preview_kind() {
        assert_eq!(PreviewKind::from_name("cat.JPG"), PreviewKind::Image);
        assert_eq!(PreviewKind::from_name("clip.ogg"), PreviewKind::Video);
        assert_eq!(PreviewKind::from_name("song.mp3"), PreviewKind::Audio);
        assert_eq!(PreviewKind::from_name("paper.pdf"), PreviewKind::Pdf);
        assert_eq!(PreviewKind::from_name("notes.md"), PreviewKind::Text);
        assert_eq!(PreviewKind::from_name("archive.tar.gz"), PreviewKind::Other);
        assert_eq!(PreviewKind::from_name("README"), PreviewKind::Other);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_view_page_contents() {
        let record = record("photo.png");
        let page = view_page(&record, "https://x.ngrok.app", true);

        assert!(page.contains("<title>photo.png - Hashdrop</title>"));
        assert!(page.contains(&format!(r#"<img src="/preview/{}""#, record.content_hash)));
        assert!(page.contains(&format!("/download/{}?direct=1", record.content_hash)));
        assert!(page.contains(&format!(
            "https://x.ngrok.app/view/{}",
            record.content_hash
        )));
        assert!(page.contains("2.0 KB"));
        assert!(page.contains("Copy Public view link"));
    }

    #[test]
    fn test_not_found_page() {
        assert!(not_found_page().contains("File not found"));
    }
}
