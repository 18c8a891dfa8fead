//! Backing store for uploaded bytes.
//!
//! This module handles:
//! - Writing uploads to the upload directory while hashing them
//! - Opening, sizing and deleting stored files
//! - Filename sanitization
//!
//! Files are stored under their sanitized display name. Two different
//! uploads sharing a name therefore share a path on disk; the last writer
//! wins there, even though the registry keeps a record per hash.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::crypto::ContentHasher;
use crate::error::{Error, Result};

/// Result of persisting one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Where the bytes live
    pub path: PathBuf,
    /// Number of bytes written
    pub size: u64,
    /// Hex SHA-256 of the bytes
    pub hash: String,
}

/// A directory of stored uploads.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root` without touching the filesystem.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store, creating the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open_dir(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root).await?;
        Ok(store)
    }

    /// The upload directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a file with this sanitized name is stored at.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Start writing a new file under `name`.
    ///
    /// Bytes go to a hidden part file and are moved into place by
    /// [`StoredFileWriter::finish`], so readers of an older file with the
    /// same name never observe a half-written replacement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUpload`] if the name is not already sanitized,
    /// or an I/O error if the part file cannot be created.
    pub async fn writer(&self, name: &str) -> Result<StoredFileWriter> {
        if sanitize_filename(name).as_deref() != Some(name) {
            return Err(Error::InvalidUpload(format!("unsafe file name '{name}'")));
        }

        tokio::fs::create_dir_all(&self.root).await?;

        let part_path = self
            .root
            .join(format!(".{name}.{}.part", uuid::Uuid::new_v4().simple()));
        let file = File::create(&part_path).await?;

        Ok(StoredFileWriter {
            final_path: self.path_for(name),
            part_path,
            file: Some(file),
            hasher: ContentHasher::new(),
        })
    }

    /// Persist a complete buffer under `name`.
    ///
    /// The buffer is written and hashed in [`crate::HASH_CHUNK_SIZE`] pieces.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<StoredFile> {
        let mut writer = self.writer(name).await?;
        for chunk in bytes.chunks(crate::HASH_CHUNK_SIZE) {
            if let Err(e) = writer.write_chunk(chunk).await {
                writer.abort().await;
                return Err(e);
            }
        }
        writer.finish().await
    }

    /// Open a stored file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub async fn open(&self, path: &Path) -> Result<File> {
        Ok(File::open(path).await?)
    }

    /// Current size of a stored file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub async fn size(&self, path: &Path) -> Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    /// Remove a stored file. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Streaming writer that hashes while it writes.
#[derive(Debug)]
pub struct StoredFileWriter {
    final_path: PathBuf,
    part_path: PathBuf,
    file: Option<File>,
    hasher: ContentHasher,
}

impl StoredFileWriter {
    /// Append a chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if let Some(ref mut file) = self.file {
            file.write_all(chunk).await?;
        }
        self.hasher.update(chunk);
        Ok(())
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.hasher.bytes_hashed()
    }

    /// Flush, move the file into place and return its hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be synced or renamed.
    pub async fn finish(mut self) -> Result<StoredFile> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        tokio::fs::rename(&self.part_path, &self.final_path).await?;

        let size = self.hasher.bytes_hashed();
        Ok(StoredFile {
            path: self.final_path,
            size,
            hash: self.hasher.finalize_hex(),
        })
    }

    /// Discard the partial file.
    pub async fn abort(mut self) {
        self.file = None;
        if let Err(e) = tokio::fs::remove_file(&self.part_path).await {
            tracing::debug!("Failed to remove {}: {}", self.part_path.display(), e);
        }
    }
}

/// Reduce an uploaded filename to a safe, flat file name.
///
/// Keeps ASCII letters, digits, `_`, `.` and `-`. Path separators and
/// whitespace runs become a single `_`, everything else is dropped, and
/// leading or trailing `.`/`_` are trimmed. Returns `None` if nothing usable
/// is left.
#[must_use]
pub fn sanitize_filename(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for c in name.chars() {
        if c == '/' || c == '\\' || c.is_whitespace() {
            pending_sep = true;
        } else if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Format a file size for display.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_sanitize_plain_names() {
        assert_eq!(sanitize_filename("a.txt").as_deref(), Some("a.txt"));
        assert_eq!(
            sanitize_filename("My cool  movie.mov").as_deref(),
            Some("My_cool_movie.mov")
        );
        assert_eq!(sanitize_filename("rép-ort.pdf").as_deref(), Some("rp-ort.pdf"));
    }

    #[test]
    fn test_sanitize_traversal() {
        assert_eq!(
            sanitize_filename("../../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\notes.txt").as_deref(),
            Some("C_Users_me_notes.txt")
        );
        assert_eq!(sanitize_filename(".hidden").as_deref(), Some("hidden"));
    }

    #[test]
    fn test_sanitize_nothing_left() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("../.."), None);
        assert_eq!(sanitize_filename("日本語"), None);
    }

    #[tokio::test]
    async fn test_save_hashes_what_was_written() {
        let dir = TempDir::new().expect("create temp dir");
        let store = FileStore::open_dir(dir.path().join("uploads"))
            .await
            .expect("open store");

        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let stored = store.save("big.bin", &content).await.expect("save");

        assert_eq!(stored.size, content.len() as u64);
        assert_eq!(stored.hash, crate::crypto::sha256_hex(&content));
        assert_eq!(stored.path, store.path_for("big.bin"));
        let on_disk = tokio::fs::read(&stored.path).await.expect("read back");
        assert_eq!(crate::crypto::sha256_hex(&on_disk), stored.hash);
        assert_eq!(store.size(&stored.path).await.expect("size"), stored.size);
    }

    #[tokio::test]
    async fn test_writer_counts_bytes() {
        let dir = TempDir::new().expect("create temp dir");
        let store = FileStore::new(dir.path());

        let mut writer = store.writer("count.bin").await.expect("writer");
        assert_eq!(writer.bytes_written(), 0);
        writer.write_chunk(b"abc").await.expect("write");
        writer.write_chunk(b"defgh").await.expect("write");
        assert_eq!(writer.bytes_written(), 8);
        writer.abort().await;
    }

    #[tokio::test]
    async fn test_save_empty_file() {
        let dir = TempDir::new().expect("create temp dir");
        let store = FileStore::new(dir.path());

        let stored = store.save("empty.txt", b"").await.expect("save");
        assert_eq!(stored.size, 0);
        assert_eq!(stored.hash, crate::crypto::sha256_hex(b""));
        assert!(stored.path.exists());
    }

    #[tokio::test]
    async fn test_no_part_files_left_behind() {
        let dir = TempDir::new().expect("create temp dir");
        let store = FileStore::new(dir.path());
        store.save("a.txt", b"hello").await.expect("save");

        let writer = store.writer("b.txt").await.expect("writer");
        writer.abort().await;

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_writer_rejects_unsanitized_name() {
        let dir = TempDir::new().expect("create temp dir");
        let store = FileStore::new(dir.path());
        let err = store.writer("../escape.txt").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUpload(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().expect("create temp dir");
        let store = FileStore::new(dir.path());
        let stored = store.save("gone.txt", b"bye").await.expect("save");

        store.delete(&stored.path).await.expect("first delete");
        store.delete(&stored.path).await.expect("second delete");
        assert!(store.open(&stored.path).await.is_err());
    }
}
