//! # Media Source Boundary
//!
//! The query interface shared by remote media sources and the local cache.
//! The query layer sends a [`MediaFetchRequest`] and receives ranked
//! [`MediaMatch`]es as a [`SizedSource`].

pub mod cache_source;
pub mod matching;

use crate::error::Result;
use crate::models::{CachedMedia, MediaSourceKind, MediaSourceLocation};
use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

pub use cache_source::CacheMediaSource;
pub use matching::{MatchKind, MediaFetchRequest};

/// Result of a connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Success,
    Failed,
}

impl ConnectionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ConnectionStatus::Success)
    }
}

/// Descriptive information shown for a media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSourceInfo {
    pub display_name: String,
    pub description: Option<String>,
}

/// A cached media item paired with how well it satisfies a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMatch {
    pub media: CachedMedia,
    pub kind: MatchKind,
}

/// Result set whose total size is known up front.
///
/// Sources backed by a static snapshot return everything as one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedSource<T> {
    items: Vec<T>,
    total_size: usize,
}

impl<T> SizedSource<T> {
    pub fn single_page(items: Vec<T>) -> Self {
        let total_size = items.len();
        Self { items, total_size }
    }

    pub fn empty() -> Self {
        Self::single_page(Vec::new())
    }

    /// Number of items across all pages.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn into_stream(self) -> impl Stream<Item = T> {
        stream::iter(self.items)
    }
}

/// A queryable source of media.
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn id(&self) -> &str;

    fn location(&self) -> MediaSourceLocation;

    fn kind(&self) -> MediaSourceKind;

    fn info(&self) -> MediaSourceInfo;

    async fn check_connection(&self) -> ConnectionStatus;

    /// Find media satisfying `request`, best matches first.
    ///
    /// Finding nothing is a successful, empty result.
    async fn fetch(&self, request: &MediaFetchRequest) -> Result<SizedSource<MediaMatch>>;
}
