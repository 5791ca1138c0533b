//! Progress models shared with the external dashboard.

use serde::{Deserialize, Serialize};

/// State of the current indexing cycle.
///
/// Reset at the start of every cycle and persisted on every change so an
/// external reader (or a restarted process) can observe the last known
/// state even mid-crash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexingProgress {
    pub in_progress: bool,
    pub total_files: usize,
    pub files_processed: usize,
    /// Percentage, derived from the two counters.
    pub progress: f64,
}

impl IndexingProgress {
    /// Recompute the derived percentage from the counters.
    pub fn update_percent(&mut self) {
        self.progress = if self.total_files == 0 {
            0.0
        } else {
            (self.files_processed as f64 / self.total_files as f64) * 100.0
        };
    }
}

/// Transient state for one acquisition run.
///
/// Rebuilt at the start of each run; not required to survive a crash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub in_progress: bool,
    /// Unix timestamp of run start, seconds.
    pub start_time: u64,
    pub bytes_downloaded: u64,
    /// Instantaneous speed in KB/s.
    pub download_speed: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_zero_for_empty_corpus() {
        let mut progress = IndexingProgress {
            in_progress: true,
            total_files: 0,
            files_processed: 0,
            progress: 42.0,
        };
        progress.update_percent();
        assert_eq!(progress.progress, 0.0);
    }

    #[test]
    fn percent_tracks_counters() {
        let mut progress = IndexingProgress {
            in_progress: true,
            total_files: 4,
            files_processed: 1,
            progress: 0.0,
        };
        progress.update_percent();
        assert_eq!(progress.progress, 25.0);
    }
}
