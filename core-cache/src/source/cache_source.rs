//! The local cache exposed as a read-only media source.

use super::{
    ConnectionStatus, MatchKind, MediaFetchRequest, MediaMatch, MediaSource, MediaSourceInfo,
    SizedSource,
};
use crate::error::Result;
use crate::models::{MediaSourceKind, MediaSourceLocation};
use crate::storage::MediaCacheStorage;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tracing::{debug, instrument};

/// Media source answering queries from one storage's entry set.
///
/// Holds only a weak reference; once the storage is dropped every fetch
/// returns an empty result.
pub struct CacheMediaSource {
    id: String,
    storage: Weak<dyn MediaCacheStorage>,
}

impl CacheMediaSource {
    pub fn new(storage: &Arc<dyn MediaCacheStorage>) -> Self {
        Self {
            id: storage.media_source_id().to_string(),
            storage: Arc::downgrade(storage),
        }
    }
}

#[async_trait]
impl MediaSource for CacheMediaSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> MediaSourceLocation {
        MediaSourceLocation::Local
    }

    fn kind(&self) -> MediaSourceKind {
        MediaSourceKind::LocalCache
    }

    fn info(&self) -> MediaSourceInfo {
        MediaSourceInfo {
            display_name: "Local cache".to_string(),
            description: Some(format!("Media cached by storage {}", self.id)),
        }
    }

    async fn check_connection(&self) -> ConnectionStatus {
        ConnectionStatus::Success
    }

    #[instrument(skip(self, request), fields(source = %self.id, subject_id = %request.subject_id))]
    async fn fetch(&self, request: &MediaFetchRequest) -> Result<SizedSource<MediaMatch>> {
        let Some(storage) = self.storage.upgrade() else {
            debug!("Storage dropped, nothing to fetch");
            return Ok(SizedSource::empty());
        };
        let snapshot = storage.list();
        drop(storage);

        let mut matches: Vec<MediaMatch> = snapshot
            .iter()
            .filter_map(|handle| {
                let kind = request.matches(handle.metadata());
                (kind != MatchKind::None).then(|| MediaMatch {
                    media: handle.cached_media(&self.id),
                    kind,
                })
            })
            .collect();
        // stable: equal kinds keep entry order
        matches.sort_by(|a, b| b.kind.cmp(&a.kind));

        debug!(
            candidates = snapshot.len(),
            matched = matches.len(),
            "Fetched from cache"
        );
        Ok(SizedSource::single_page(matches))
    }
}
