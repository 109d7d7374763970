//! Cache storage configuration

use crate::error::{CacheError, Result};
use crate::record::DEFAULT_RECORD_EXTENSION;
use bridge_traits::{Clock, FileSystemAccess, SystemClock};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one [`DirectoryCacheStorage`](crate::DirectoryCacheStorage).
///
/// Each storage owns exactly one metadata directory; two storages must not
/// share one.
#[derive(Clone)]
pub struct CacheStorageConfig {
    /// Identifier of the storage when it acts as a media source
    pub media_source_id: String,

    /// Directory holding this storage's save records
    pub metadata_dir: PathBuf,

    /// Extension marking save records (default: "metadata")
    pub record_extension: String,

    /// Run the restore scan on construction (default: true)
    pub restore_on_start: bool,

    /// Bus for `CacheEvent`s; `None` disables events
    pub event_bus: Option<EventBus>,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub clock: Arc<dyn Clock>,
}

impl CacheStorageConfig {
    pub fn builder() -> CacheStorageConfigBuilder {
        CacheStorageConfigBuilder::default()
    }

    /// Derive a storage config from the shared core config.
    ///
    /// Records are placed at `cache_dir/<media_source_id>`.
    pub fn from_core_config(core: &CoreConfig, media_source_id: impl Into<String>) -> Result<Self> {
        let media_source_id = media_source_id.into();
        let mut builder = Self::builder()
            .media_source_id(media_source_id.clone())
            .metadata_dir(core.cache_dir.join(&media_source_id))
            .file_system(Arc::clone(&core.file_system))
            .clock(Arc::clone(&core.clock))
            .restore_on_start(core.features.restore_on_start);

        if core.features.cache_events {
            builder = builder.event_bus(core.event_bus.clone());
        }

        builder.build()
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.media_source_id.trim().is_empty() {
            return Err(CacheError::InvalidConfig(
                "media_source_id cannot be empty".to_string(),
            ));
        }

        if self.metadata_dir.as_os_str().is_empty() {
            return Err(CacheError::InvalidConfig(
                "metadata_dir cannot be empty".to_string(),
            ));
        }

        if self.record_extension.is_empty()
            || !self
                .record_extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CacheError::InvalidConfig(format!(
                "record_extension must be a non-empty alphanumeric suffix without dots, got {:?}",
                self.record_extension
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CacheStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStorageConfig")
            .field("media_source_id", &self.media_source_id)
            .field("metadata_dir", &self.metadata_dir)
            .field("record_extension", &self.record_extension)
            .field("restore_on_start", &self.restore_on_start)
            .field("event_bus", &self.event_bus.is_some())
            .finish()
    }
}

/// Builder for [`CacheStorageConfig`].
#[derive(Default)]
pub struct CacheStorageConfigBuilder {
    media_source_id: Option<String>,
    metadata_dir: Option<PathBuf>,
    record_extension: Option<String>,
    restore_on_start: Option<bool>,
    event_bus: Option<EventBus>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CacheStorageConfigBuilder {
    pub fn media_source_id(mut self, id: impl Into<String>) -> Self {
        self.media_source_id = Some(id.into());
        self
    }

    pub fn metadata_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.metadata_dir = Some(dir.into());
        self
    }

    pub fn record_extension(mut self, extension: impl Into<String>) -> Self {
        self.record_extension = Some(extension.into());
        self
    }

    pub fn restore_on_start(mut self, enabled: bool) -> Self {
        self.restore_on_start = Some(enabled);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<CacheStorageConfig> {
        let media_source_id = self.media_source_id.ok_or_else(|| {
            CacheError::InvalidConfig(
                "media_source_id is required. Use .media_source_id() to set it.".to_string(),
            )
        })?;
        let metadata_dir = self.metadata_dir.ok_or_else(|| {
            CacheError::InvalidConfig(
                "metadata_dir is required. Use .metadata_dir() to set it.".to_string(),
            )
        })?;
        let file_system = self.file_system.ok_or_else(|| {
            CacheError::InvalidConfig(
                "file_system is required. Use .file_system() or CacheStorageConfig::from_core_config()."
                    .to_string(),
            )
        })?;

        let config = CacheStorageConfig {
            media_source_id,
            metadata_dir,
            record_extension: self
                .record_extension
                .unwrap_or_else(|| DEFAULT_RECORD_EXTENSION.to_string()),
            restore_on_start: self.restore_on_start.unwrap_or(true),
            event_bus: self.event_bus,
            file_system,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;
        Ok(config)
    }
}
