//! Engine transfer statistics

use serde::{Deserialize, Serialize};

/// Aggregate transfer statistics reported by a cache engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Bytes uploaded since the engine started
    pub total_uploaded: u64,

    /// Bytes downloaded since the engine started
    pub total_downloaded: u64,

    /// Current upload rate in bytes/second
    pub upload_rate: u64,

    /// Current download rate in bytes/second
    pub download_rate: u64,

    /// Number of caches with an active transfer
    pub active_transfers: usize,
}

impl EngineStats {
    /// Upload/download ratio; zero before anything was downloaded.
    pub fn share_ratio(&self) -> f64 {
        if self.total_downloaded == 0 {
            return 0.0;
        }
        self.total_uploaded as f64 / self.total_downloaded as f64
    }

    pub fn is_idle(&self) -> bool {
        self.active_transfers == 0 && self.upload_rate == 0 && self.download_rate == 0
    }
}
