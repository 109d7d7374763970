//! Classification of cached media against a fetch request.

use crate::models::CacheMetadata;
use serde::{Deserialize, Serialize};

/// How well a cached item satisfies a request. Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    None,
    /// Same subject and episode number, different ids
    Fuzzy,
    /// Same subject id and episode id
    Exact,
}

/// What the query layer is looking for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFetchRequest {
    pub subject_id: String,
    pub episode_id: String,
    #[serde(default)]
    pub subject_names: Vec<String>,
    /// Position within the whole series, e.g. "13"
    #[serde(default)]
    pub episode_sort: String,
    /// Position within the season, if it differs from the sort
    #[serde(default)]
    pub episode_ep: Option<String>,
    #[serde(default)]
    pub episode_name: String,
}

impl MediaFetchRequest {
    pub fn new(subject_id: impl Into<String>, episode_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            episode_id: episode_id.into(),
            ..Default::default()
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

    /// Classify the cache described by `metadata`.
    pub fn matches(&self, metadata: &CacheMetadata) -> MatchKind {
        if self.subject_id == metadata.subject_id && self.episode_id == metadata.episode_id {
            return MatchKind::Exact;
        }

        if self.same_subject(metadata) && self.same_episode(metadata) {
            MatchKind::Fuzzy
        } else {
            MatchKind::None
        }
    }

    fn same_subject(&self, metadata: &CacheMetadata) -> bool {
        if !self.subject_id.is_empty() && self.subject_id == metadata.subject_id {
            return true;
        }
        self.subject_names.iter().any(|wanted| {
            let wanted = wanted.trim().to_lowercase();
            !wanted.is_empty()
                && metadata
                    .subject_names
                    .iter()
                    .any(|name| name.trim().to_lowercase() == wanted)
        })
    }

    fn same_episode(&self, metadata: &CacheMetadata) -> bool {
        if same_episode_number(&self.episode_sort, &metadata.episode_sort) {
            return true;
        }
        match (&self.episode_ep, &metadata.episode_ep) {
            (Some(wanted), Some(cached)) => same_episode_number(wanted, cached),
            _ => false,
        }
    }
}

/// Compare episode numbers, treating "01" and "1" (or "1.0") as equal.
fn same_episode_number(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a.eq_ignore_ascii_case(b),
    }
}
