//! # Core Configuration Module
//!
//! Provides configuration management for the media cache core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and settings every cache storage
//! shares. It enforces fail-fast validation so a missing capability surfaces
//! at startup instead of on the first save record write.
//!
//! ## Required Dependencies
//!
//! - `FileSystemAccess` - Save record persistence (desktop default: tokio fs)
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Timestamps written into save records (default: `SystemClock`)
//!
//! When the `desktop-shims` feature is enabled, `TokioFileSystem` is injected
//! automatically if no file system is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .cache_dir("/path/to/cache")
//!     .event_bus_capacity(256)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{Clock, FileSystemAccess, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for the event bus buffer.
const MAX_EVENT_BUS_CAPACITY: usize = 65_536;

/// Core configuration for the media cache core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root directory; each storage keeps its save records in a subdirectory
    pub cache_dir: PathBuf,

    /// File system access abstraction
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Time source for save record timestamps
    pub clock: Arc<dyn Clock>,

    /// Buffer size of the shared event bus
    pub event_bus_capacity: usize,

    /// Shared event bus handed to every storage built from this config
    pub event_bus: EventBus,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("cache_dir", &self.cache_dir)
            .field("file_system", &"FileSystemAccess { ... }")
            .field("clock", &"Clock { ... }")
            .field("event_bus_capacity", &self.event_bus_capacity)
            .field("event_bus", &self.event_bus)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional behavior of cache storages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Scan the metadata directory and restore caches when a storage starts
    pub restore_on_start: bool,

    /// Publish `CacheEvent`s on the event bus
    pub cache_events: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            restore_on_start: true,
            cache_events: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Cache directory is not empty
    /// - Event bus capacity is within bounds
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.event_bus_capacity == 0 {
            return Err(Error::Config(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.event_bus_capacity > MAX_EVENT_BUS_CAPACITY {
            return Err(Error::Config(format!(
                "Event bus capacity exceeds maximum of {}",
                MAX_EVENT_BUS_CAPACITY
            )));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for save record persistence. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Mobile: inject a sandboxed app-directory implementation."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    cache_dir: Option<PathBuf>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    clock: Option<Arc<dyn Clock>>,
    event_bus_capacity: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the cache directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .cache_dir("/path/to/cache");
    /// ```
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the file system implementation.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the clock used to stamp save records.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = Some(capacity);
        self
    }

    pub fn restore_on_start(mut self, enabled: bool) -> Self {
        self.features.restore_on_start = enabled;
        self
    }

    pub fn cache_events(mut self, enabled: bool) -> Self {
        self.features.cache_events = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The cache directory is missing
    /// - No `FileSystemAccess` was provided and no desktop default exists
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let event_bus_capacity = self.event_bus_capacity.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);

        // broadcast::channel panics on zero capacity
        if event_bus_capacity == 0 || event_bus_capacity > MAX_EVENT_BUS_CAPACITY {
            return Err(Error::Config(format!(
                "Event bus capacity must be between 1 and {}",
                MAX_EVENT_BUS_CAPACITY
            )));
        }

        let config = CoreConfig {
            cache_dir,
            file_system,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_bus_capacity,
            event_bus: EventBus::new(event_bus_capacity),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
