//! Publishing of cache lifecycle events on the shared event bus.

use crate::models::MediaId;
use crate::restore::RestoreReport;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use tracing::trace;

/// Emits `CoreEvent::Cache` events tagged with one storage's source id.
///
/// Emission is best-effort: a bus without subscribers drops the event.
#[derive(Clone, Debug)]
pub struct CacheEventPublisher {
    bus: Option<EventBus>,
    media_source_id: String,
}

impl CacheEventPublisher {
    pub fn new(bus: Option<EventBus>, media_source_id: impl Into<String>) -> Self {
        Self {
            bus,
            media_source_id: media_source_id.into(),
        }
    }

    /// Publisher that discards everything.
    pub fn disabled(media_source_id: impl Into<String>) -> Self {
        Self::new(None, media_source_id)
    }

    fn emit(&self, event: CacheEvent) {
        let Some(bus) = &self.bus else {
            return;
        };
        if bus.emit(CoreEvent::Cache(event)).is_err() {
            trace!(media_source_id = %self.media_source_id, "No event subscribers");
        }
    }

    pub fn created(&self, media_id: &MediaId) {
        self.emit(CacheEvent::Created {
            media_source_id: self.media_source_id.clone(),
            media_id: media_id.to_string(),
        });
    }

    pub fn restored(&self, media_id: &MediaId) {
        self.emit(CacheEvent::Restored {
            media_source_id: self.media_source_id.clone(),
            media_id: media_id.to_string(),
        });
    }

    pub fn restore_skipped(&self, file: &str, reason: impl Into<String>) {
        self.emit(CacheEvent::RestoreSkipped {
            media_source_id: self.media_source_id.clone(),
            file: file.to_string(),
            reason: reason.into(),
        });
    }

    pub fn restore_completed(&self, report: &RestoreReport) {
        self.emit(CacheEvent::RestoreCompleted {
            media_source_id: self.media_source_id.clone(),
            restored: report.restored,
            skipped: report.skipped(),
        });
    }

    pub fn deleted(&self, media_id: &MediaId) {
        self.emit(CacheEvent::Deleted {
            media_source_id: self.media_source_id.clone(),
            media_id: media_id.to_string(),
        });
    }

    pub fn persistence_failed(&self, media_id: &MediaId, message: impl Into<String>) {
        self.emit(CacheEvent::PersistenceFailed {
            media_source_id: self.media_source_id.clone(),
            media_id: media_id.to_string(),
            message: message.into(),
        });
    }
}
