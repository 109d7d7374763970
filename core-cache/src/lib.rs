//! # Core Cache Module
//!
//! Persistent media cache sitting between media sources and a download
//! engine.
//!
//! ## Overview
//!
//! This crate tracks which remote media items are cached locally, persists
//! that state as save records so it survives restarts, and exposes the cached
//! set as a queryable media source. It provides:
//!
//! - **Storage** (`storage`): the orchestrator guaranteeing one live cache
//!   handle per media identity
//! - **Engine boundary** (`engine`): traits implemented by download engines,
//!   plus an in-memory [`DummyCacheEngine`]
//! - **Save records** (`record`): one JSON file per cache entry
//! - **Restore scan** (`restore`): rebuilds entries from records on startup
//! - **Cache source** (`source`): the entry set as a [`MediaSource`]
//! - **Manager** (`manager`): lookups across several storages
//!
//! ## Usage
//!
//! ```no_run
//! use core_cache::{
//!     CacheMediaSource, CacheStorageConfig, DirectoryCacheStorage, DummyCacheEngine,
//!     MediaCacheStorage, MediaFetchRequest, MediaSource,
//! };
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let core = CoreConfig::builder().cache_dir("/var/cache/app").build()?;
//! let storage: Arc<dyn MediaCacheStorage> = Arc::new(DirectoryCacheStorage::new(
//!     CacheStorageConfig::from_core_config(&core, "local")?,
//!     Arc::new(DummyCacheEngine::new()),
//! )?);
//! storage.wait_restored().await?;
//!
//! let source = CacheMediaSource::new(&storage);
//! let found = source
//!     .fetch(&MediaFetchRequest::new("subject-1", "episode-3"))
//!     .await?;
//! println!("{} cached matches", found.len());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod entries;
pub mod error;
pub mod events;
pub mod manager;
pub mod models;
pub mod record;
pub mod restore;
pub mod source;
pub mod stats;
pub mod storage;

pub use config::{CacheStorageConfig, CacheStorageConfigBuilder};
pub use engine::{CacheEngine, CacheHandle, DummyCacheEngine, DummyCacheHandle};
pub use entries::EntrySnapshot;
pub use error::{CacheError, Result};
pub use manager::MediaCacheManager;
pub use models::{
    CacheMetadata, CacheProgress, CacheState, CachedMedia, EpisodeRange, MediaId,
    MediaProperties, MediaSourceKind, MediaSourceLocation, OriginMedia, ResourceLocation,
};
pub use record::{SaveRecord, DEFAULT_RECORD_EXTENSION};
pub use restore::RestoreReport;
pub use source::{
    CacheMediaSource, ConnectionStatus, MatchKind, MediaFetchRequest, MediaMatch, MediaSource,
    MediaSourceInfo, SizedSource,
};
pub use stats::EngineStats;
pub use storage::{DirectoryCacheStorage, MediaCacheStorage};
