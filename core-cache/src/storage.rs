//! # Media Cache Storage
//!
//! Orchestrates one directory of save records, one cache engine and the
//! in-memory entry set built from them.
//!
//! ## Overview
//!
//! A storage guarantees at most one live handle per media identity. Creating
//! a cache runs engine create, save-record write and entry insertion inside a
//! single critical section, so concurrent `cache()` calls for the same media
//! produce exactly one engine creation and all callers receive the same
//! handle. Deleting runs engine delete, record removal and entry removal in
//! the same critical section.
//!
//! On construction the storage spawns two background tasks inside its own
//! cancellation scope:
//!
//! - the restore scan, rebuilding entries from records of an earlier run
//! - the aggregation pipeline behind `subscribe_count()` and
//!   `subscribe_total_size()`
//!
//! Both stop when the storage is closed or dropped.
//!
//! ## Usage
//!
//! ```no_run
//! use core_cache::{
//!     CacheMetadata, CacheStorageConfig, DirectoryCacheStorage, DummyCacheEngine,
//!     MediaCacheStorage, OriginMedia, ResourceLocation,
//! };
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let core = CoreConfig::builder().cache_dir("/var/cache/app").build()?;
//! let config = CacheStorageConfig::from_core_config(&core, "local")?;
//! let storage = DirectoryCacheStorage::new(config, Arc::new(DummyCacheEngine::new()))?;
//!
//! let report = storage.wait_restored().await?;
//! println!("restored {} caches", report.restored);
//!
//! let origin = OriginMedia::new(
//!     "dmhy.42",
//!     "dmhy",
//!     ResourceLocation::MagnetUri { uri: "magnet:?xt=urn:btih:42".into() },
//!     "[Group] Show - 03",
//! );
//! let handle = storage
//!     .cache(&origin, &CacheMetadata::new("subject-1", "episode-3"), true)
//!     .await?;
//! println!("cache size: {}", *handle.total_size().borrow());
//! # Ok(())
//! # }
//! ```

use crate::aggregate::{spawn_aggregation, AggregateViews};
use crate::config::CacheStorageConfig;
use crate::engine::{CacheEngine, CacheHandle};
use crate::entries::{CacheEntrySet, EntrySnapshot};
use crate::error::{CacheError, Result};
use crate::events::CacheEventPublisher;
use crate::models::{CacheMetadata, OriginMedia};
use crate::record::RecordStore;
use crate::restore::{restore_persisted_caches, RestoreReport};
use crate::stats::EngineStats;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Persistent, deduplicated set of cache handles.
#[async_trait]
pub trait MediaCacheStorage: Send + Sync {
    /// Identifier of this storage when exposed as a media source.
    fn media_source_id(&self) -> &str;

    /// Look up the handle for `media`, resuming it if requested.
    ///
    /// An unknown media is `Ok(None)`, not an error.
    async fn find_cache(
        &self,
        media: &OriginMedia,
        resume: bool,
    ) -> Result<Option<Arc<dyn CacheHandle>>>;

    /// Return the handle for `media`, creating and persisting it if needed.
    ///
    /// An existing handle is returned unchanged and `metadata` is ignored.
    async fn cache(
        &self,
        media: &OriginMedia,
        metadata: &CacheMetadata,
        resume: bool,
    ) -> Result<Arc<dyn CacheHandle>>;

    /// Delete the cache for `media`. Returns `false` if none was tracked.
    async fn delete(&self, media: &OriginMedia) -> Result<bool>;

    async fn delete_cache(&self, handle: &Arc<dyn CacheHandle>) -> Result<bool> {
        self.delete(handle.origin()).await
    }

    /// Current handles, in insertion order.
    fn list(&self) -> EntrySnapshot;

    fn subscribe_list(&self) -> watch::Receiver<EntrySnapshot>;

    fn count(&self) -> usize;

    fn subscribe_count(&self) -> watch::Receiver<usize>;

    /// Sum of the sizes of all tracked handles, in bytes.
    fn total_size(&self) -> u64;

    fn subscribe_total_size(&self) -> watch::Receiver<u64>;

    /// Transfer statistics of the underlying engine.
    async fn stats(&self) -> EngineStats;

    /// Wait for the startup restore scan to finish.
    async fn wait_restored(&self) -> Result<RestoreReport>;

    /// Stop background work and close the engine. Idempotent.
    async fn close(&self);
}

/// [`MediaCacheStorage`] backed by a directory of save records.
pub struct DirectoryCacheStorage {
    media_source_id: String,
    engine: Arc<dyn CacheEngine>,
    records: RecordStore,
    entries: Arc<CacheEntrySet>,
    views: AggregateViews,
    restored: watch::Receiver<Option<RestoreReport>>,
    events: CacheEventPublisher,
    scope: CancellationToken,
    closed: AtomicBool,
}

impl DirectoryCacheStorage {
    /// Create a storage and start its restore scan.
    ///
    /// Must be called from within a tokio runtime; returns immediately
    /// without waiting for the scan.
    pub fn new(config: CacheStorageConfig, engine: Arc<dyn CacheEngine>) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            CacheError::InvalidConfig(format!("storage requires a tokio runtime: {}", e))
        })?;

        let records = RecordStore::new(
            Arc::clone(&config.file_system),
            Arc::clone(&config.clock),
            config.metadata_dir.clone(),
            config.record_extension.clone(),
        );
        let events = CacheEventPublisher::new(config.event_bus.clone(), &config.media_source_id);
        let entries = Arc::new(CacheEntrySet::new());
        let scope = CancellationToken::new();

        let views = spawn_aggregation(entries.subscribe(), scope.child_token());

        let restored = if config.restore_on_start {
            let (restored_tx, restored) = watch::channel(None);
            let engine = Arc::clone(&engine);
            let records = records.clone();
            let entries = Arc::clone(&entries);
            let events = events.clone();
            let scope = scope.child_token();

            runtime.spawn(async move {
                tokio::select! {
                    _ = scope.cancelled() => {
                        debug!("Restore scan aborted by close");
                    }
                    report = restore_persisted_caches(
                        engine.as_ref(),
                        &records,
                        &entries,
                        &scope,
                        &events,
                    ) => {
                        restored_tx.send_replace(Some(report));
                    }
                }
            });
            restored
        } else {
            debug!(media_source_id = %config.media_source_id, "Restore on start disabled");
            watch::channel(Some(RestoreReport::default())).1
        };

        info!(
            media_source_id = %config.media_source_id,
            dir = ?config.metadata_dir,
            "Cache storage opened"
        );

        Ok(Self {
            media_source_id: config.media_source_id,
            engine,
            records,
            entries,
            views,
            restored,
            events,
            scope,
            closed: AtomicBool::new(false),
        })
    }

    /// Directory holding this storage's save records.
    pub fn metadata_dir(&self) -> &Path {
        self.records.dir()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }
        Ok(())
    }

    async fn resume_handle(&self, handle: &Arc<dyn CacheHandle>) {
        if let Err(e) = handle.resume().await {
            warn!(
                media_id = %handle.origin().media_id,
                error = %e,
                "Failed to resume cache"
            );
        }
    }
}

#[async_trait]
impl MediaCacheStorage for DirectoryCacheStorage {
    fn media_source_id(&self) -> &str {
        &self.media_source_id
    }

    #[instrument(skip(self, media), fields(media_id = %media.media_id))]
    async fn find_cache(
        &self,
        media: &OriginMedia,
        resume: bool,
    ) -> Result<Option<Arc<dyn CacheHandle>>> {
        self.ensure_open()?;

        let found = self.entries.lock().await.find(&media.media_id);
        match &found {
            Some(handle) if resume => self.resume_handle(handle).await,
            Some(_) => {}
            None => debug!("No cache for media"),
        }
        Ok(found)
    }

    #[instrument(skip(self, media, metadata), fields(media_id = %media.media_id))]
    async fn cache(
        &self,
        media: &OriginMedia,
        metadata: &CacheMetadata,
        resume: bool,
    ) -> Result<Arc<dyn CacheHandle>> {
        self.ensure_open()?;

        let handle = {
            let mut entries = self.entries.lock().await;

            if let Some(existing) = entries.find(&media.media_id) {
                debug!("Cache already exists, returning existing handle");
                existing
            } else {
                if !self.engine.supports(media) {
                    warn!(kind = ?media.kind, "Engine does not support media");
                    return Err(CacheError::UnsupportedMedia(media.media_id.to_string()));
                }

                let handle = self
                    .engine
                    .create_cache(media, metadata, &self.scope)
                    .await?;

                if let Err(e) = self.records.write(media, handle.metadata()).await {
                    error!(error = %e, "Failed to write save record, discarding new cache");
                    if let Err(cleanup) = handle.delete().await {
                        warn!(error = %cleanup, "Failed to delete discarded cache");
                    }
                    self.events.persistence_failed(&media.media_id, e.to_string());
                    return Err(e);
                }

                entries.insert(Arc::clone(&handle));
                info!(entries = entries.len(), "Cache created");
                self.events.created(&media.media_id);
                handle
            }
        };

        if resume {
            self.resume_handle(&handle).await;
        }
        Ok(handle)
    }

    #[instrument(skip(self, media), fields(media_id = %media.media_id))]
    async fn delete(&self, media: &OriginMedia) -> Result<bool> {
        self.ensure_open()?;

        let mut entries = self.entries.lock().await;
        let Some(handle) = entries.find(&media.media_id) else {
            debug!("No cache to delete");
            return Ok(false);
        };

        if let Err(e) = handle.delete().await {
            error!(error = %e, "Engine failed to delete cache, keeping entry");
            return Err(e);
        }

        match self.records.remove(&media.media_id).await {
            Ok(true) => {}
            Ok(false) => warn!("Save record was already missing"),
            Err(e) => {
                warn!(error = %e, "Failed to remove save record");
                self.events.persistence_failed(&media.media_id, e.to_string());
            }
        }

        entries.remove(&media.media_id);
        info!(entries = entries.len(), "Cache deleted");
        drop(entries);

        self.events.deleted(&media.media_id);
        Ok(true)
    }

    fn list(&self) -> EntrySnapshot {
        self.entries.snapshot()
    }

    fn subscribe_list(&self) -> watch::Receiver<EntrySnapshot> {
        self.entries.subscribe()
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.views.count.clone()
    }

    fn total_size(&self) -> u64 {
        *self.views.total_size.borrow()
    }

    fn subscribe_total_size(&self) -> watch::Receiver<u64> {
        self.views.total_size.clone()
    }

    async fn stats(&self) -> EngineStats {
        self.engine.stats().await
    }

    async fn wait_restored(&self) -> Result<RestoreReport> {
        self.ensure_open()?;

        let mut restored = self.restored.clone();
        let report = restored
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CacheError::Closed)?;
        Ok((*report).unwrap_or_default())
    }

    #[instrument(skip(self), fields(media_source_id = %self.media_source_id))]
    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.scope.cancel();
        self.engine.close().await;
        info!(entries = self.entries.len(), "Cache storage closed");
    }
}

impl Drop for DirectoryCacheStorage {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

impl std::fmt::Debug for DirectoryCacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryCacheStorage")
            .field("media_source_id", &self.media_source_id)
            .field("records", &self.records)
            .field("entries", &self.entries.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
