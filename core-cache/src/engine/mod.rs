//! # Cache Engine Boundary
//!
//! Traits implemented by download engines (BitTorrent, HTTP, ...). Storages
//! depend only on these abstractions.
//!
//! An engine turns an `(OriginMedia, CacheMetadata)` pair into a
//! [`CacheHandle`], either freshly (allocating storage and starting a
//! transfer) or by re-attaching to payload already on disk after a restart.
//! Handles expose size and progress as `tokio::sync::watch` channels so any
//! number of observers can follow them without polling.

pub mod dummy;

use crate::error::Result;
use crate::models::{CacheMetadata, CacheProgress, CachedMedia, OriginMedia};
use crate::stats::EngineStats;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub use dummy::{DummyCacheEngine, DummyCacheHandle};

/// Engine-owned live object representing one local copy of a media item.
///
/// Storages hold handles by `Arc` but never own the payload; deleting the
/// handle is what releases engine-side storage.
#[async_trait]
pub trait CacheHandle: Send + Sync {
    fn origin(&self) -> &OriginMedia;

    fn metadata(&self) -> &CacheMetadata;

    /// Total size in bytes, updated as the engine learns or grows it.
    fn total_size(&self) -> watch::Receiver<u64>;

    fn progress(&self) -> watch::Receiver<CacheProgress>;

    /// Start or continue the transfer.
    async fn resume(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Stop the transfer and release engine-side storage.
    ///
    /// Must be safe to call more than once.
    async fn delete(&self) -> Result<()>;

    /// Release in-memory resources while keeping the payload on disk.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Project the handle as a local media item of the given cache source.
    fn cached_media(&self, cache_media_source_id: &str) -> CachedMedia;
}

/// Pluggable download engine.
#[async_trait]
pub trait CacheEngine: Send + Sync {
    /// Create a fresh cache for `origin`.
    ///
    /// Background work the engine spawns for the handle should stop when
    /// `scope` is cancelled.
    async fn create_cache(
        &self,
        origin: &OriginMedia,
        metadata: &CacheMetadata,
        scope: &CancellationToken,
    ) -> Result<Arc<dyn CacheHandle>>;

    /// Re-attach to payload persisted by an earlier run.
    ///
    /// `Ok(None)` means the engine declined (payload missing or unusable).
    async fn restore(
        &self,
        origin: &OriginMedia,
        metadata: &CacheMetadata,
        scope: &CancellationToken,
    ) -> Result<Option<Arc<dyn CacheHandle>>>;

    /// Whether this engine can cache `origin` at all.
    fn supports(&self, _origin: &OriginMedia) -> bool {
        true
    }

    async fn stats(&self) -> EngineStats {
        EngineStats::default()
    }

    /// Shut the engine down. Called once when the owning storage closes.
    async fn close(&self) {}
}
