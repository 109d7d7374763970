//! # Cache Manager
//!
//! Read-mostly facade over several storages (for example one per engine).
//! Lookups visit storages in registration order; closed storages are skipped.

use crate::engine::CacheHandle;
use crate::error::{CacheError, Result};
use crate::models::OriginMedia;
use crate::storage::MediaCacheStorage;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct MediaCacheManager {
    storages: Vec<Arc<dyn MediaCacheStorage>>,
}

impl MediaCacheManager {
    pub fn new(storages: Vec<Arc<dyn MediaCacheStorage>>) -> Self {
        Self { storages }
    }

    pub fn storages(&self) -> &[Arc<dyn MediaCacheStorage>] {
        &self.storages
    }

    pub fn storage(&self, media_source_id: &str) -> Option<&Arc<dyn MediaCacheStorage>> {
        self.storages
            .iter()
            .find(|storage| storage.media_source_id() == media_source_id)
    }

    /// Handles of every storage, concatenated in registration order.
    pub fn list_all(&self) -> Vec<Arc<dyn CacheHandle>> {
        self.storages
            .iter()
            .flat_map(|storage| storage.list().iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn total_count(&self) -> usize {
        self.storages.iter().map(|storage| storage.count()).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.storages.iter().map(|storage| storage.total_size()).sum()
    }

    /// First handle for `media` across storages.
    #[instrument(skip(self, media), fields(media_id = %media.media_id))]
    pub async fn find_first_cache(
        &self,
        media: &OriginMedia,
    ) -> Result<Option<Arc<dyn CacheHandle>>> {
        for storage in &self.storages {
            match storage.find_cache(media, false).await {
                Ok(Some(handle)) => return Ok(Some(handle)),
                Ok(None) | Err(CacheError::Closed) => continue,
                Err(e) => return Err(e),
            }
        }
        debug!("No storage holds media");
        Ok(None)
    }

    /// Handles whose metadata was recorded for exactly this episode.
    pub fn find_caches_for_episode(
        &self,
        subject_id: &str,
        episode_id: &str,
    ) -> Vec<Arc<dyn CacheHandle>> {
        self.list_all()
            .into_iter()
            .filter(|handle| {
                let metadata = handle.metadata();
                metadata.subject_id == subject_id && metadata.episode_id == episode_id
            })
            .collect()
    }

    /// Delete `media` from the first storage tracking it.
    #[instrument(skip(self, media), fields(media_id = %media.media_id))]
    pub async fn delete_first(&self, media: &OriginMedia) -> Result<bool> {
        for storage in &self.storages {
            match storage.delete(media).await {
                Ok(true) => {
                    info!(storage = storage.media_source_id(), "Deleted cache");
                    return Ok(true);
                }
                Ok(false) | Err(CacheError::Closed) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    pub async fn close_all(&self) {
        for storage in &self.storages {
            storage.close().await;
        }
    }
}

impl std::fmt::Debug for MediaCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self
            .storages
            .iter()
            .map(|storage| storage.media_source_id())
            .collect();
        f.debug_struct("MediaCacheManager")
            .field("storages", &ids)
            .finish()
    }
}
