//! # Cache Domain Models
//!
//! Value types shared by storages, engines and the cache-as-source adapter.
//!
//! `OriginMedia` and `CacheMetadata` are immutable once built and are exactly
//! what a save record persists; engines receive them on create and restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Identity
// ============================================================================

/// Stable unique identifier of a remote media item.
///
/// The dedup key across the whole cache subsystem: a storage tracks at most
/// one cache per `MediaId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MediaId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Origin Media
// ============================================================================

/// Where the payload of a media item can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceLocation {
    MagnetUri { uri: String },
    HttpTorrentFile { uri: String },
    HttpStreamingFile { uri: String },
    LocalFile { path: PathBuf },
}

impl ResourceLocation {
    pub fn is_local(&self) -> bool {
        matches!(self, ResourceLocation::LocalFile { .. })
    }
}

/// Network distance of a media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSourceLocation {
    Online,
    Lan,
    Local,
}

/// Transport family of a media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSourceKind {
    Web,
    BitTorrent,
    LocalCache,
}

/// Episodes covered by a single media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EpisodeRange {
    Single { sort: String },
    Range { start: String, end: String },
    Season { season: u32 },
}

/// Descriptive properties parsed from a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProperties {
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub episode_name: Option<String>,
    /// e.g. "1080P"
    #[serde(default)]
    pub resolution: Option<String>,
    /// Fansub group or uploader
    #[serde(default)]
    pub alliance: Option<String>,
    #[serde(default)]
    pub subtitle_languages: Vec<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// Immutable description of a remote media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMedia {
    pub media_id: MediaId,
    /// Source that produced this item (not the cache storage)
    pub media_source_id: String,
    pub original_url: String,
    pub download: ResourceLocation,
    pub original_title: String,
    #[serde(default)]
    pub published_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: MediaProperties,
    #[serde(default)]
    pub episode_range: Option<EpisodeRange>,
    pub location: MediaSourceLocation,
    pub kind: MediaSourceKind,
}

impl OriginMedia {
    /// Create an online BitTorrent origin with empty properties.
    pub fn new(
        media_id: impl Into<MediaId>,
        media_source_id: impl Into<String>,
        download: ResourceLocation,
        original_title: impl Into<String>,
    ) -> Self {
        Self {
            media_id: media_id.into(),
            media_source_id: media_source_id.into(),
            original_url: String::new(),
            download,
            original_title: original_title.into(),
            published_time: None,
            properties: MediaProperties::default(),
            episode_range: None,
            location: MediaSourceLocation::Online,
            kind: MediaSourceKind::BitTorrent,
        }
    }

    pub fn with_original_url(mut self, url: impl Into<String>) -> Self {
        self.original_url = url.into();
        self
    }

    pub fn with_published_time(mut self, time: DateTime<Utc>) -> Self {
        self.published_time = Some(time);
        self
    }

    pub fn with_properties(mut self, properties: MediaProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_episode_range(mut self, range: EpisodeRange) -> Self {
        self.episode_range = Some(range);
        self
    }

    pub fn with_source(mut self, location: MediaSourceLocation, kind: MediaSourceKind) -> Self {
        self.location = location;
        self.kind = kind;
        self
    }
}

// ============================================================================
// Cache Metadata
// ============================================================================

/// How a cached item was requested.
///
/// Stored next to the origin so later queries can classify a cache against a
/// fetch request without contacting the original source. `extra` is free
/// for engines (e.g. torrent info hashes); a `BTreeMap` keeps the record
/// encoding stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub subject_id: String,
    pub episode_id: String,
    #[serde(default)]
    pub subject_names: Vec<String>,
    #[serde(default)]
    pub episode_sort: String,
    #[serde(default)]
    pub episode_ep: Option<String>,
    #[serde(default)]
    pub episode_name: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl CacheMetadata {
    pub fn new(subject_id: impl Into<String>, episode_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            episode_id: episode_id.into(),
            subject_names: Vec::new(),
            episode_sort: String::new(),
            episode_ep: None,
            episode_name: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_subject_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subject_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_episode_sort(mut self, sort: impl Into<String>) -> Self {
        self.episode_sort = sort.into();
        self
    }

    pub fn with_episode_ep(mut self, ep: impl Into<String>) -> Self {
        self.episode_ep = Some(ep.into());
        self
    }

    pub fn with_episode_name(mut self, name: impl Into<String>) -> Self {
        self.episode_name = name.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Lifecycle state of one cache handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Pending,
    InProgress,
    Paused,
    Completed,
    Failed,
    Deleted,
}

impl CacheState {
    pub fn is_finished(&self) -> bool {
        matches!(self, CacheState::Completed | CacheState::Deleted)
    }
}

/// Snapshot published on a handle's progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheProgress {
    pub state: CacheState,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
}

impl CacheProgress {
    pub fn pending() -> Self {
        Self {
            state: CacheState::Pending,
            downloaded_bytes: 0,
            total_bytes: 0,
        }
    }

    /// Fraction downloaded in `0.0..=1.0`; zero while the size is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.downloaded_bytes as f64 / self.total_bytes as f64).min(1.0)
    }
}

impl Default for CacheProgress {
    fn default() -> Self {
        Self::pending()
    }
}

// ============================================================================
// Cached Media
// ============================================================================

/// A cache handle projected as a playable local media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMedia {
    /// `"{cache_media_source_id}:{origin.media_id}"`
    pub media_id: String,
    pub origin: OriginMedia,
    pub cache_media_source_id: String,
    pub download: ResourceLocation,
    pub location: MediaSourceLocation,
    pub kind: MediaSourceKind,
}

impl CachedMedia {
    pub fn new(
        origin: OriginMedia,
        cache_media_source_id: impl Into<String>,
        download: ResourceLocation,
    ) -> Self {
        let cache_media_source_id = cache_media_source_id.into();
        Self {
            media_id: format!("{}:{}", cache_media_source_id, origin.media_id),
            origin,
            cache_media_source_id,
            download,
            location: MediaSourceLocation::Local,
            kind: MediaSourceKind::LocalCache,
        }
    }
}
