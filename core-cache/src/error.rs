//! # Cache Error Types
//!
//! Errors surfaced by cache storages, engines and the cache-as-source adapter.

use bridge_traits::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during media cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The download engine failed to create, restore, resume or delete a cache.
    #[error("Cache engine error: {0}")]
    Engine(String),

    /// The engine cannot handle this kind of media.
    #[error("Media not supported by cache engine: {0}")]
    UnsupportedMedia(String),

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// Reading, writing or removing a save record failed.
    #[error("Save record I/O failed at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: BridgeError,
    },

    /// A save record could not be encoded or decoded.
    #[error("Save record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Host bridge failure outside of a specific record path.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The storage has been closed.
    #[error("Cache storage is closed")]
    Closed,

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    pub fn engine(message: impl Into<String>) -> Self {
        CacheError::Engine(message.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, source: BridgeError) -> Self {
        CacheError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Returns true for save record I/O and encoding failures.
    pub fn is_persistence_error(&self) -> bool {
        matches!(
            self,
            CacheError::Persistence { .. } | CacheError::Serialization(_)
        )
    }

    pub fn is_engine_error(&self) -> bool {
        matches!(self, CacheError::Engine(_) | CacheError::UnsupportedMedia(_))
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_keeps_path() {
        let err = CacheError::persistence(
            "/cache/ab12.metadata",
            BridgeError::OperationFailed("disk full".to_string()),
        );
        assert!(err.is_persistence_error());
        assert!(!err.is_engine_error());
        assert!(err.to_string().contains("ab12.metadata"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_serialization_error_is_persistence() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(err.is_persistence_error());
    }

    #[test]
    fn test_engine_error_classification() {
        assert!(CacheError::engine("payload missing").is_engine_error());
        assert!(CacheError::UnsupportedMedia("web".to_string()).is_engine_error());
        assert!(!CacheError::Closed.is_engine_error());
    }
}
