//! On-disk side artifacts: extraction cache files and the durable
//! progress snapshot.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::IndexingProgress;

/// Cache of previously computed plain-text extractions, one file per
/// stable id.
///
/// Created on first successful extraction and never mutated, so a re-run
/// after a structured-store failure does not repeat expensive OCR.
/// Presence and non-empty size is the only validity check.
#[derive(Debug, Clone)]
pub struct ExtractionCache {
    dir: PathBuf,
}

impl ExtractionCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, stable_id: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", stable_id))
    }

    /// Return the cached text for a stable id, if a non-empty cache file
    /// exists.
    pub fn lookup(&self, stable_id: &str) -> Option<String> {
        let path = self.path_for(stable_id);
        let metadata = fs::metadata(&path).ok()?;
        if metadata.len() == 0 {
            return None;
        }
        fs::read_to_string(&path).ok()
    }

    /// Store extracted text for a stable id.
    pub fn store(&self, stable_id: &str, text: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(stable_id), text)
    }
}

/// Overwrite the progress snapshot atomically (write-then-rename), so the
/// file stays valid JSON even if the process is killed mid-write.
pub fn write_progress_file(path: &Path, progress: &IndexingProgress) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let json = serde_json::to_string(progress)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read the last persisted progress snapshot, if any.
pub fn read_progress_file(path: &Path) -> Option<IndexingProgress> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
