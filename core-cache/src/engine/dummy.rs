//! In-process cache engine that transfers nothing.
//!
//! Useful for development hosts and tests: handles publish size and progress
//! like a real engine, and failures can be injected per engine or per handle.
//! The engine remembers the handles it produced so tests can inspect them;
//! deleted or closed handles are forgotten once nothing else holds them.

use super::{CacheEngine, CacheHandle};
use crate::error::{CacheError, Result};
use crate::models::{
    CacheMetadata, CacheProgress, CacheState, CachedMedia, MediaId, MediaSourceKind, OriginMedia,
    ResourceLocation,
};
use crate::stats::EngineStats;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cache engine keeping all state in memory.
pub struct DummyCacheEngine {
    payload_dir: PathBuf,
    initial_size: u64,
    create_delay: Option<Duration>,
    unsupported_kinds: Vec<MediaSourceKind>,
    fail_create: AtomicBool,
    rejected: Mutex<HashSet<MediaId>>,
    handles: Mutex<Vec<Arc<DummyCacheHandle>>>,
    creations: AtomicUsize,
    restores: AtomicUsize,
    closed: AtomicBool,
}

impl DummyCacheEngine {
    pub fn new() -> Self {
        Self {
            payload_dir: std::env::temp_dir().join("dummy-cache-engine"),
            initial_size: 0,
            create_delay: None,
            unsupported_kinds: Vec::new(),
            fail_create: AtomicBool::new(false),
            rejected: Mutex::new(HashSet::new()),
            handles: Mutex::new(Vec::new()),
            creations: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Directory used for the (fake) payload paths of projected media.
    pub fn with_payload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.payload_dir = dir.into();
        self
    }

    /// Size every new or restored handle starts with.
    pub fn with_initial_size(mut self, bytes: u64) -> Self {
        self.initial_size = bytes;
        self
    }

    /// Simulate a slow engine handshake on create.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn with_unsupported_kind(mut self, kind: MediaSourceKind) -> Self {
        self.unsupported_kinds.push(kind);
        self
    }

    /// Make subsequent `create_cache` calls fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Decline restoring the given media, as if its payload were gone.
    pub async fn reject_restore(&self, media_id: impl Into<MediaId>) {
        self.rejected.lock().await.insert(media_id.into());
    }

    pub fn creation_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn restore_count(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Most recent handle produced for `media_id`.
    pub async fn handle_for(&self, media_id: &MediaId) -> Option<Arc<DummyCacheHandle>> {
        self.handles
            .lock()
            .await
            .iter()
            .rev()
            .find(|h| &h.origin.media_id == media_id)
            .cloned()
    }

    /// Handles the engine still remembers, including deleted and closed ones
    /// that are referenced elsewhere.
    pub async fn handles(&self) -> Vec<Arc<DummyCacheHandle>> {
        self.handles.lock().await.clone()
    }

    fn payload_path(&self, media_id: &MediaId) -> PathBuf {
        let file_name: String = media_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.payload_dir.join(file_name)
    }

    async fn register(
        &self,
        origin: &OriginMedia,
        metadata: &CacheMetadata,
        restored: bool,
    ) -> Arc<DummyCacheHandle> {
        let handle = Arc::new(DummyCacheHandle::new(
            origin.clone(),
            metadata.clone(),
            self.payload_path(&origin.media_id),
            self.initial_size,
            restored,
        ));
        let mut handles = self.handles.lock().await;
        handles.retain(|h| Arc::strong_count(h) > 1 || !(h.is_deleted() || h.is_closed()));
        handles.push(Arc::clone(&handle));
        handle
    }
}

impl Default for DummyCacheEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheEngine for DummyCacheEngine {
    async fn create_cache(
        &self,
        origin: &OriginMedia,
        metadata: &CacheMetadata,
        scope: &CancellationToken,
    ) -> Result<Arc<dyn CacheHandle>> {
        if scope.is_cancelled() {
            return Err(CacheError::engine("engine scope cancelled"));
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(CacheError::engine(format!(
                "injected create failure for {}",
                origin.media_id
            )));
        }

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        self.creations.fetch_add(1, Ordering::SeqCst);
        debug!(media_id = %origin.media_id, "Dummy engine created cache");
        let handle: Arc<dyn CacheHandle> = self.register(origin, metadata, false).await;
        Ok(handle)
    }

    async fn restore(
        &self,
        origin: &OriginMedia,
        metadata: &CacheMetadata,
        scope: &CancellationToken,
    ) -> Result<Option<Arc<dyn CacheHandle>>> {
        if scope.is_cancelled() {
            return Err(CacheError::engine("engine scope cancelled"));
        }
        if self.rejected.lock().await.contains(&origin.media_id) {
            debug!(media_id = %origin.media_id, "Dummy engine declined restore");
            return Ok(None);
        }

        self.restores.fetch_add(1, Ordering::SeqCst);
        let handle: Arc<dyn CacheHandle> = self.register(origin, metadata, true).await;
        Ok(Some(handle))
    }

    fn supports(&self, origin: &OriginMedia) -> bool {
        !self.unsupported_kinds.contains(&origin.kind)
    }

    async fn stats(&self) -> EngineStats {
        let handles = self.handles.lock().await;
        handles
            .iter()
            .filter(|h| !h.is_deleted())
            .fold(EngineStats::default(), |mut stats, handle| {
                let progress = *handle.progress.borrow();
                stats.total_downloaded += progress.downloaded_bytes;
                if progress.state == CacheState::InProgress {
                    stats.active_transfers += 1;
                }
                stats
            })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Handle produced by [`DummyCacheEngine`].
pub struct DummyCacheHandle {
    origin: OriginMedia,
    metadata: CacheMetadata,
    payload: PathBuf,
    size: watch::Sender<u64>,
    progress: watch::Sender<CacheProgress>,
    restored: bool,
    deleted: AtomicBool,
    closed: AtomicBool,
    fail_delete: AtomicBool,
    resumes: AtomicUsize,
}

impl DummyCacheHandle {
    fn new(
        origin: OriginMedia,
        metadata: CacheMetadata,
        payload: PathBuf,
        initial_size: u64,
        restored: bool,
    ) -> Self {
        let state = if restored {
            CacheState::Paused
        } else {
            CacheState::Pending
        };
        let (size, _) = watch::channel(initial_size);
        let (progress, _) = watch::channel(CacheProgress {
            state,
            downloaded_bytes: if restored { initial_size } else { 0 },
            total_bytes: initial_size,
        });

        Self {
            origin,
            metadata,
            payload,
            size,
            progress,
            restored,
            deleted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            resumes: AtomicUsize::new(0),
        }
    }

    /// Publish a new total size.
    pub fn set_size(&self, bytes: u64) {
        self.size.send_replace(bytes);
        self.progress.send_modify(|p| p.total_bytes = bytes);
    }

    /// Publish download progress; reaching the total size completes the cache.
    pub fn set_downloaded(&self, bytes: u64) {
        self.progress.send_modify(|p| {
            p.downloaded_bytes = bytes;
            if p.total_bytes > 0 && bytes >= p.total_bytes {
                p.state = CacheState::Completed;
            }
        });
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn was_restored(&self) -> bool {
        self.restored
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> CacheState {
        self.progress.borrow().state
    }
}

#[async_trait]
impl CacheHandle for DummyCacheHandle {
    fn origin(&self) -> &OriginMedia {
        &self.origin
    }

    fn metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    fn total_size(&self) -> watch::Receiver<u64> {
        self.size.subscribe()
    }

    fn progress(&self) -> watch::Receiver<CacheProgress> {
        self.progress.subscribe()
    }

    async fn resume(&self) -> Result<()> {
        if self.is_deleted() {
            return Err(CacheError::engine(format!(
                "cannot resume deleted cache {}",
                self.origin.media_id
            )));
        }
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.progress.send_modify(|p| {
            if p.state != CacheState::Completed {
                p.state = CacheState::InProgress;
            }
        });
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.progress.send_modify(|p| {
            if p.state == CacheState::InProgress {
                p.state = CacheState::Paused;
            }
        });
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CacheError::engine(format!(
                "injected delete failure for {}",
                self.origin.media_id
            )));
        }
        self.deleted.store(true, Ordering::SeqCst);
        self.size.send_replace(0);
        self.progress.send_modify(|p| {
            p.state = CacheState::Deleted;
            p.downloaded_bytes = 0;
            p.total_bytes = 0;
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn cached_media(&self, cache_media_source_id: &str) -> CachedMedia {
        CachedMedia::new(
            self.origin.clone(),
            cache_media_source_id,
            ResourceLocation::LocalFile {
                path: self.payload.clone(),
            },
        )
    }
}
