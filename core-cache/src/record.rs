//! # Save Record Persistence
//!
//! One file per cache entry, named `sha256_hex(media_id).<extension>`, holding
//! the pretty-printed JSON of a [`SaveRecord`]. Records are written when a
//! cache is created, removed when it is deleted and read back by the startup
//! restore scan.

use crate::error::{CacheError, Result};
use crate::models::{CacheMetadata, MediaId, OriginMedia};
use bridge_traits::{Clock, FileSystemAccess};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default save record extension.
pub const DEFAULT_RECORD_EXTENSION: &str = "metadata";

/// Persisted `(origin, metadata)` pair used to rebuild a cache handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub origin: OriginMedia,
    pub metadata: CacheMetadata,
    /// When the record was written; absent in older records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SaveRecord {
    pub fn new(origin: OriginMedia, metadata: CacheMetadata) -> Self {
        Self {
            origin,
            metadata,
            saved_at: None,
        }
    }

    pub fn with_saved_at(mut self, saved_at: DateTime<Utc>) -> Self {
        self.saved_at = Some(saved_at);
        self
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Content-addressed file name for a media identity.
pub fn record_file_name(media_id: &MediaId, extension: &str) -> String {
    let digest = Sha256::digest(media_id.as_str().as_bytes());
    format!("{}.{}", hex::encode(digest), extension)
}

/// Directory of save records belonging to one storage.
#[derive(Clone)]
pub struct RecordStore {
    fs: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    dir: PathBuf,
    extension: String,
}

impl RecordStore {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
        dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            clock,
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn path_for(&self, media_id: &MediaId) -> PathBuf {
        self.dir.join(record_file_name(media_id, &self.extension))
    }

    /// Write (or replace) the record for `origin`.
    pub async fn write(&self, origin: &OriginMedia, metadata: &CacheMetadata) -> Result<PathBuf> {
        let path = self.path_for(&origin.media_id);
        let record =
            SaveRecord::new(origin.clone(), metadata.clone()).with_saved_at(self.clock.now());
        let data = record.to_bytes()?;

        self.fs
            .create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::persistence(&self.dir, e))?;
        self.fs
            .write_file(&path, data)
            .await
            .map_err(|e| CacheError::persistence(&path, e))?;

        debug!(media_id = %origin.media_id, path = ?path, "Wrote save record");
        Ok(path)
    }

    /// Remove the record for `media_id`. Returns `false` if none existed.
    pub async fn remove(&self, media_id: &MediaId) -> Result<bool> {
        let path = self.path_for(media_id);
        match self.fs.delete_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(CacheError::persistence(path, e)),
        }
    }

    pub async fn read(&self, path: &Path) -> Result<SaveRecord> {
        let data = self
            .fs
            .read_file(path)
            .await
            .map_err(|e| CacheError::persistence(path, e))?;
        SaveRecord::from_bytes(&data)
    }

    /// Record files in the directory, sorted by name.
    ///
    /// A missing directory simply has no records.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let exists = self
            .fs
            .exists(&self.dir)
            .await
            .map_err(|e| CacheError::persistence(&self.dir, e))?;
        if !exists {
            return Ok(Vec::new());
        }

        let mut records: Vec<PathBuf> = self
            .fs
            .list_directory(&self.dir)
            .await
            .map_err(|e| CacheError::persistence(&self.dir, e))?
            .into_iter()
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == self.extension)
            })
            .collect();
        records.sort();
        Ok(records)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("dir", &self.dir)
            .field("extension", &self.extension)
            .finish()
    }
}
