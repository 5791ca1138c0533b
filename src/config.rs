//! Configuration management for Recordsift.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default database filename.
const DEFAULT_DATABASE_FILENAME: &str = "recordsift.db";

/// Subdirectory for cached plain-text extractions.
const CACHE_SUBDIR: &str = "extracted";

/// Filename for the durable indexing progress snapshot.
const STATUS_FILENAME: &str = "indexing_status.json";

/// The only file extension recognized as a corpus document.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Settings for the indexing loop and content extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    /// Sleep between cycles, in seconds.
    pub cycle_sleep_secs: u64,
    /// Maximum number of pages rasterized for OCR fallback, regardless of
    /// document length.
    pub page_cap: u32,
    /// Hard wall-clock timeout for a single recognizer call, in seconds.
    pub ocr_timeout_secs: u64,
    /// Attempts per page before the page is skipped.
    pub ocr_attempts: u32,
    /// Pacing delay between recognizer attempts, in seconds.
    pub ocr_pacing_secs: u64,
    /// Grace delay before removing rasterized artifacts, in seconds.
    pub cleanup_grace_secs: u64,
    /// Maximum page image size in bytes before the page is rejected.
    pub max_image_bytes: u64,
    /// Maximum page image dimension in pixels before downscaling.
    pub max_image_dimension: u32,
    /// Optional cap on documents per cycle (0 = unlimited).
    pub cycle_limit: usize,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            cycle_sleep_secs: 30,
            page_cap: 3,
            ocr_timeout_secs: 60,
            ocr_attempts: 2,
            ocr_pacing_secs: 2,
            cleanup_grace_secs: 1,
            max_image_bytes: 10 * 1024 * 1024,
            max_image_dimension: 2000,
            cycle_limit: 0,
        }
    }
}

impl IndexingSettings {
    pub fn cycle_sleep(&self) -> Duration {
        Duration::from_secs(self.cycle_sleep_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn ocr_pacing(&self) -> Duration {
        Duration::from_secs(self.ocr_pacing_secs)
    }

    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_secs(self.cleanup_grace_secs)
    }
}

/// One remote acquisition source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    /// Subcorpus directory the source populates.
    pub subcorpus: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// How documents are acquired from a source.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Scrape an archive listing page for direct `.pdf`/`.zip` links.
    Listing { url: String },
    /// Run an out-of-process acquisition helper and poll its speed file.
    Helper {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        speed_file: PathBuf,
    },
}

/// Settings for the download manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Trailing duration to hold published throughput before clearing, so
    /// a polling observer never catches a false end-of-run instant read.
    pub linger_secs: u64,
    /// Poll interval for helper speed files, in milliseconds.
    pub speed_poll_ms: u64,
    /// Configured acquisition sources.
    pub sources: Vec<SourceSettings>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            linger_secs: 5,
            speed_poll_ms: 1000,
            sources: Vec::new(),
        }
    }
}

impl DownloadSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_secs)
    }

    pub fn speed_poll(&self) -> Duration {
        Duration::from_millis(self.speed_poll_ms)
    }
}

/// Application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base data directory. The corpus lives in named subdirectories here.
    pub data_dir: PathBuf,
    /// Database filename, relative to `data_dir`.
    pub database_filename: String,
    /// Origin categories; each is a corpus subdirectory.
    pub subcorpora: Vec<String>,
    pub indexing: IndexingSettings,
    pub download: DownloadSettings,
    /// Bind host for the query surface.
    pub host: String,
    /// Bind port for the query surface.
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            subcorpora: vec![
                "national_archives".to_string(),
                "municipal_records".to_string(),
            ],
            indexing: IndexingSettings::default(),
            download: DownloadSettings::default(),
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Load settings from a TOML file, or defaults when no file exists.
    ///
    /// `RECORDSIFT_DATA_DIR` overrides the data directory in either case.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("recordsift.toml"));

        let mut settings = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            toml::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?
        } else if config_path.is_some() {
            anyhow::bail!("config file not found: {}", path.display());
        } else {
            Self::default()
        };

        if let Ok(dir) = std::env::var("RECORDSIFT_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }

        Ok(settings)
    }

    /// Get the full path to the SQLite database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Path of the durable indexing progress snapshot.
    pub fn status_file_path(&self) -> PathBuf {
        self.data_dir.join(STATUS_FILENAME)
    }

    /// Directory holding cached plain-text extractions.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join(CACHE_SUBDIR)
    }

    /// Corpus directory for one subcorpus.
    pub fn subcorpus_dir(&self, subcorpus: &str) -> PathBuf {
        self.data_dir.join(subcorpus)
    }

    /// Ensure the data directory, corpus subdirectories, and cache exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.cache_dir())?;
        for subcorpus in &self.subcorpora {
            fs::create_dir_all(self.subcorpus_dir(subcorpus))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.indexing.page_cap, 3);
        assert!(settings
            .database_path()
            .ends_with(DEFAULT_DATABASE_FILENAME));
        assert!(!settings.subcorpora.is_empty());
    }

    #[test]
    fn parses_source_kinds() {
        let raw = r#"
            data_dir = "/tmp/rs"

            [[download.sources]]
            subcorpus = "national_archives"
            kind = "listing"
            url = "https://example.gov/releases"

            [[download.sources]]
            subcorpus = "municipal_records"
            kind = "helper"
            command = "./fetch_municipal.sh"
            speed_file = "/tmp/rs/municipal_speed.json"
        "#;
        let settings: Settings = toml::from_str(raw).unwrap();
        assert_eq!(settings.download.sources.len(), 2);
        assert!(matches!(
            settings.download.sources[0].kind,
            SourceKind::Listing { .. }
        ));
        assert!(matches!(
            settings.download.sources[1].kind,
            SourceKind::Helper { .. }
        ));
    }
}
