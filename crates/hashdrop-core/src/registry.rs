//! Content-addressed registry of uploaded files.
//!
//! The registry maps the hex SHA-256 of a file's bytes to its metadata. It
//! lives only in memory: a restart forgets every record, although the bytes
//! stay in the upload directory.
//!
//! ## Duplicate uploads
//!
//! Registering bytes that are already known replaces the record under the
//! same hash: the new display name and upload time win and the download
//! count starts again from zero. The entry keeps its original position in
//! [`FileRegistry::list`].

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::store::{FileStore, StoredFile};

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Hex SHA-256 of the file's bytes
    pub content_hash: String,
    /// Sanitized original filename
    pub display_name: String,
    /// Where the bytes are stored
    pub storage_location: PathBuf,
    /// Size at upload time
    pub size_bytes: u64,
    /// When the record was created
    pub uploaded_at: DateTime<Utc>,
    /// Completed download requests
    pub download_count: u64,
}

#[derive(Debug, Default)]
struct Entries {
    records: Vec<FileRecord>,
    index: HashMap<String, usize>,
}

impl Entries {
    fn upsert(&mut self, record: FileRecord) -> Option<FileRecord> {
        if let Some(&pos) = self.index.get(&record.content_hash) {
            Some(std::mem::replace(&mut self.records[pos], record))
        } else {
            self.index
                .insert(record.content_hash.clone(), self.records.len());
            self.records.push(record);
            None
        }
    }

    fn get(&self, hash: &str) -> Option<&FileRecord> {
        self.index.get(hash).map(|&pos| &self.records[pos])
    }

    fn get_mut(&mut self, hash: &str) -> Option<&mut FileRecord> {
        self.index.get(hash).map(|&pos| &mut self.records[pos])
    }
}

/// In-memory registry of uploaded files, keyed by content hash.
#[derive(Debug)]
pub struct FileRegistry {
    store: FileStore,
    entries: RwLock<Entries>,
}

impl FileRegistry {
    /// Create an empty registry backed by `store`.
    #[must_use]
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &FileStore {
        &self.store
    }

    /// Persist `bytes` under `display_name` and register them.
    ///
    /// `display_name` must already be sanitized (see
    /// [`crate::store::sanitize_filename`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be written.
    pub async fn register(&self, bytes: &[u8], display_name: &str) -> Result<FileRecord> {
        let stored = self.store.save(display_name, bytes).await?;
        Ok(self.register_stored(stored, display_name).await)
    }

    /// Register bytes that were already written to the store.
    pub async fn register_stored(&self, stored: StoredFile, display_name: &str) -> FileRecord {
        let record = FileRecord {
            content_hash: stored.hash,
            display_name: display_name.to_string(),
            storage_location: stored.path,
            size_bytes: stored.size,
            uploaded_at: Utc::now(),
            download_count: 0,
        };

        let previous = self.entries.write().await.upsert(record.clone());

        match previous {
            Some(old) => tracing::info!(
                "Replaced {} ({} -> {}, {} downloads dropped)",
                record.content_hash,
                old.display_name,
                record.display_name,
                old.download_count
            ),
            None => tracing::info!(
                "Registered {} as {} ({} bytes)",
                record.content_hash,
                record.display_name,
                record.size_bytes
            ),
        }

        record
    }

    /// Look up a record by exact hash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the hash was never registered.
    pub async fn lookup(&self, hash: &str) -> Result<FileRecord> {
        self.entries
            .read()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::NotFound(hash.to_string()))
    }

    /// Count one download and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the hash was never registered.
    pub async fn record_download(&self, hash: &str) -> Result<FileRecord> {
        let mut entries = self.entries.write().await;
        let record = entries
            .get_mut(hash)
            .ok_or_else(|| Error::NotFound(hash.to_string()))?;
        record.download_count += 1;
        Ok(record.clone())
    }

    /// All records in insertion order.
    pub async fn list(&self) -> Vec<FileRecord> {
        self.entries.read().await.records.clone()
    }

    /// Number of registered files.
    pub async fn len(&self) -> usize {
        self.entries.read().await.records.len()
    }

    /// Whether nothing has been registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.records.is_empty()
    }
}
