//! # Startup Restore Scan
//!
//! Rebuilds the entry set from the save records left by a previous run.
//!
//! Failures are isolated per file: an unreadable record, an engine that
//! declines to restore, or a second record for an identity that is already
//! tracked only skips that file. Records are never deleted by the scan.
//! When two records resolve to the same identity the first one wins (files
//! are visited in name order). A record whose identity is already tracked is
//! skipped before the engine sees it; a handle that still loses the insert
//! race is closed.

use crate::engine::CacheEngine;
use crate::entries::CacheEntrySet;
use crate::events::CacheEventPublisher;
use crate::record::RecordStore;
use core_runtime::logging::{redact_if_sensitive, strip_path};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Outcome of one restore scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub restored: u32,
    /// Records that could not be read or decoded
    pub skipped_corrupt: u32,
    /// Records the engine declined or failed to restore
    pub skipped_rejected: u32,
    /// Records for an identity that was already tracked
    pub skipped_duplicate: u32,
}

impl RestoreReport {
    pub fn skipped(&self) -> u32 {
        self.skipped_corrupt + self.skipped_rejected + self.skipped_duplicate
    }

    /// Number of record files visited.
    pub fn total(&self) -> u32 {
        self.restored + self.skipped()
    }
}

/// Scan `records` and insert every restorable cache into `entries`.
///
/// Stops early, returning the partial report, once `scope` is cancelled.
#[instrument(skip_all, fields(dir = ?records.dir()))]
pub async fn restore_persisted_caches(
    engine: &dyn CacheEngine,
    records: &RecordStore,
    entries: &CacheEntrySet,
    scope: &CancellationToken,
    events: &CacheEventPublisher,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    let files = match records.list().await {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "Failed to list save records, nothing restored");
            events.restore_completed(&report);
            return report;
        }
    };
    debug!(count = files.len(), "Found save records");

    for path in files {
        if scope.is_cancelled() {
            debug!("Restore scan cancelled");
            break;
        }

        let path_str = path.to_string_lossy();
        let file = strip_path(&path_str);

        let record = match records.read(&path).await {
            Ok(record) => record,
            Err(e) => {
                warn!(file, error = %e, "Skipping unreadable save record");
                report.skipped_corrupt += 1;
                events.restore_skipped(file, e.to_string());
                continue;
            }
        };
        let media_id = record.origin.media_id.clone();
        let url = redact_if_sensitive("original_url", &record.origin.original_url);

        // A cache() racing the scan may already track this media.
        if entries.lock().await.contains(&media_id) {
            warn!(file, media_id = %media_id, "Media already tracked, skipping save record");
            report.skipped_duplicate += 1;
            events.restore_skipped(file, "duplicate media id");
            continue;
        }

        let handle = match engine
            .restore(&record.origin, &record.metadata, scope)
            .await
        {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                warn!(
                    file,
                    media_id = %media_id,
                    original_url = %url,
                    "Engine declined to restore cache"
                );
                report.skipped_rejected += 1;
                events.restore_skipped(file, "engine declined restore");
                continue;
            }
            Err(e) => {
                warn!(
                    file,
                    media_id = %media_id,
                    original_url = %url,
                    error = %e,
                    "Engine failed to restore cache"
                );
                report.skipped_rejected += 1;
                events.restore_skipped(file, e.to_string());
                continue;
            }
        };

        let inserted = entries.lock().await.insert(Arc::clone(&handle));
        if inserted {
            debug!(media_id = %media_id, "Restored cache");
            report.restored += 1;
            events.restored(&media_id);
        } else {
            // payload may be shared with the tracked handle, so close instead of delete
            if let Err(e) = handle.close().await {
                warn!(media_id = %media_id, error = %e, "Failed to close duplicate handle");
            }
            warn!(file, media_id = %media_id, "Duplicate save record, keeping existing cache");
            report.skipped_duplicate += 1;
            events.restore_skipped(file, "duplicate media id");
        }
    }

    info!(
        restored = report.restored,
        skipped = report.skipped(),
        "Restore scan completed"
    );
    events.restore_completed(&report);
    report
}
