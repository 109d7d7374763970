//! # Cache Entry Set
//!
//! The authoritative in-memory list of live handles for one storage. The list
//! sits behind a single async mutex; callers mutate it only through an
//! [`EntryGuard`], and every mutation publishes a fresh immutable snapshot on
//! a `watch` channel. No mutable reference escapes the guard.

use crate::engine::CacheHandle;
use crate::models::MediaId;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};

/// Immutable view of the entry set at one point in time.
pub type EntrySnapshot = Arc<[Arc<dyn CacheHandle>]>;

pub struct CacheEntrySet {
    entries: Mutex<Vec<Arc<dyn CacheHandle>>>,
    snapshots: watch::Sender<EntrySnapshot>,
}

impl CacheEntrySet {
    pub fn new() -> Self {
        let empty: EntrySnapshot = Arc::from(Vec::new());
        let (snapshots, _) = watch::channel(empty);
        Self {
            entries: Mutex::new(Vec::new()),
            snapshots,
        }
    }

    /// Enter the critical section.
    pub async fn lock(&self) -> EntryGuard<'_> {
        EntryGuard {
            entries: self.entries.lock().await,
            snapshots: &self.snapshots,
        }
    }

    /// Latest published snapshot. Does not wait for the lock.
    pub fn snapshot(&self) -> EntrySnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EntrySnapshot> {
        self.snapshots.subscribe()
    }

    pub fn len(&self) -> usize {
        self.snapshots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CacheEntrySet {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to the entry set; released on drop.
pub struct EntryGuard<'a> {
    entries: MutexGuard<'a, Vec<Arc<dyn CacheHandle>>>,
    snapshots: &'a watch::Sender<EntrySnapshot>,
}

impl EntryGuard<'_> {
    pub fn find(&self, media_id: &MediaId) -> Option<Arc<dyn CacheHandle>> {
        self.entries
            .iter()
            .find(|handle| &handle.origin().media_id == media_id)
            .cloned()
    }

    pub fn contains(&self, media_id: &MediaId) -> bool {
        self.entries
            .iter()
            .any(|handle| &handle.origin().media_id == media_id)
    }

    /// Append `handle` unless its identity is already tracked.
    ///
    /// Returns `false` and leaves the set untouched on a duplicate.
    pub fn insert(&mut self, handle: Arc<dyn CacheHandle>) -> bool {
        if self.contains(&handle.origin().media_id) {
            return false;
        }
        self.entries.push(handle);
        self.publish();
        true
    }

    pub fn remove(&mut self, media_id: &MediaId) -> Option<Arc<dyn CacheHandle>> {
        let index = self
            .entries
            .iter()
            .position(|handle| &handle.origin().media_id == media_id)?;
        let removed = self.entries.remove(index);
        self.publish();
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn publish(&self) {
        let snapshot: EntrySnapshot = self.entries.iter().cloned().collect();
        self.snapshots.send_replace(snapshot);
    }
}
