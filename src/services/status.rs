//! Shared status surface read by the external dashboard.
//!
//! Owned, lock-guarded state with an explicit read/write API. Writers and
//! readers only ever hold a lock for the duration of a field copy; the
//! indexing side is persisted to disk on every change so a restarted
//! process (or out-of-process reader) still sees the last known state.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{DownloadProgress, IndexingProgress};
use crate::storage;

pub struct StatusBoard {
    indexing: Mutex<IndexingProgress>,
    download: Mutex<DownloadProgress>,
    status_path: Option<PathBuf>,
}

impl StatusBoard {
    /// Status board persisting indexing progress to the given file.
    pub fn new(status_path: PathBuf) -> Self {
        Self {
            indexing: Mutex::new(IndexingProgress::default()),
            download: Mutex::new(DownloadProgress::default()),
            status_path: Some(status_path),
        }
    }

    /// Status board without durable persistence.
    pub fn in_memory() -> Self {
        Self {
            indexing: Mutex::new(IndexingProgress::default()),
            download: Mutex::new(DownloadProgress::default()),
            status_path: None,
        }
    }

    /// Snapshot of the in-process indexing progress.
    pub fn indexing_snapshot(&self) -> IndexingProgress {
        self.indexing.lock().unwrap().clone()
    }

    /// Indexing progress as an external observer should see it: the
    /// durable snapshot when one exists (the loop may run in another
    /// process), otherwise the in-memory state.
    pub fn observed_indexing(&self) -> IndexingProgress {
        if let Some(path) = &self.status_path {
            if let Some(progress) = storage::read_progress_file(path) {
                return progress;
            }
        }
        self.indexing_snapshot()
    }

    /// Snapshot of the download progress.
    pub fn download_snapshot(&self) -> DownloadProgress {
        self.download.lock().unwrap().clone()
    }

    /// Reset indexing progress for a new cycle.
    pub fn begin_cycle(&self, total_files: usize) {
        let snapshot = {
            let mut progress = self.indexing.lock().unwrap();
            progress.in_progress = true;
            progress.total_files = total_files;
            progress.files_processed = 0;
            progress.update_percent();
            progress.clone()
        };
        self.persist(&snapshot);
    }

    /// Count one document as handled (indexed, skipped, or failed).
    pub fn mark_processed(&self) {
        let snapshot = {
            let mut progress = self.indexing.lock().unwrap();
            progress.files_processed += 1;
            progress.update_percent();
            progress.clone()
        };
        self.persist(&snapshot);
    }

    /// Clear the in-progress flag; called on every cycle exit path.
    pub fn finish_cycle(&self) {
        let snapshot = {
            let mut progress = self.indexing.lock().unwrap();
            progress.in_progress = false;
            progress.clone()
        };
        self.persist(&snapshot);
    }

    /// Reset download progress for a new acquisition run.
    pub fn begin_download(&self) {
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut progress = self.download.lock().unwrap();
        *progress = DownloadProgress {
            in_progress: true,
            start_time,
            bytes_downloaded: 0,
            download_speed: 0.0,
        };
    }

    /// Account transferred bytes.
    pub fn add_download_bytes(&self, bytes: u64) {
        self.download.lock().unwrap().bytes_downloaded += bytes;
    }

    /// Publish an instantaneous speed sample in KB/s.
    pub fn set_download_speed(&self, kb_per_sec: f64) {
        self.download.lock().unwrap().download_speed = kb_per_sec;
    }

    /// Clear download state; speed converges to zero after the run ends.
    pub fn finish_download(&self) {
        let mut progress = self.download.lock().unwrap();
        progress.in_progress = false;
        progress.download_speed = 0.0;
    }

    fn persist(&self, snapshot: &IndexingProgress) {
        // Lock already released; persistence never blocks a reader.
        if let Some(path) = &self.status_path {
            if let Err(e) = storage::write_progress_file(path, snapshot) {
                tracing::error!("failed to save indexing status: {}", e);
            }
        }
    }
}
