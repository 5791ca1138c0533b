//! Download manager: acquires new documents from configured sources.
//!
//! Listing sources are scraped for direct `.pdf`/`.zip` links; helper
//! sources run an out-of-process acquisition command and poll its speed
//! file. Existing non-empty local files are never re-fetched, only
//! probed. Transfers stream to a `.part` file and are renamed into place
//! only on full success.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use scraper::{Html, Selector};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::{DownloadSettings, Settings, SourceKind, SourceSettings};
use crate::services::status::StatusBoard;

/// Errors from the download manager.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("helper failed: {0}")]
    Helper(String),

    #[error("blocking task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one acquisition run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadResult {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Instantaneous throughput in KB/s; zero when no time has passed.
pub(crate) fn kb_per_sec(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        0.0
    } else {
        (bytes as f64 / 1024.0) / elapsed_secs
    }
}

/// Per-chunk throughput accounting over a minimum sampling window.
struct Speedometer {
    window_start: Instant,
    window_bytes: u64,
    min_window: Duration,
}

impl Speedometer {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            window_bytes: 0,
            min_window: Duration::from_secs(1),
        }
    }

    /// Account a chunk; yields a speed sample once per window.
    fn record(&mut self, bytes: u64) -> Option<f64> {
        self.window_bytes += bytes;
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.min_window {
            let speed = kb_per_sec(self.window_bytes, elapsed.as_secs_f64());
            self.window_bytes = 0;
            self.window_start = Instant::now();
            Some(speed)
        } else {
            None
        }
    }
}

/// Skip rule: a same-named local file that exists and is non-empty.
fn already_acquired(dest: &Path) -> bool {
    std::fs::metadata(dest).map(|m| m.len() > 0).unwrap_or(false)
}

/// Find direct `.pdf`/`.zip` links on an archive listing page.
fn discover_links(base: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut links = Vec::new();
    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if href.ends_with(".pdf") || href.ends_with(".zip") {
                if let Ok(url) = base.join(href) {
                    if !links.contains(&url) {
                        links.push(url);
                    }
                }
            }
        }
    }
    links
}

/// Last path segment of a URL, used as the local filename.
fn remote_filename(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|segments| segments.last().map(|s| s.to_string()))
        .filter(|name| !name.is_empty())
}

/// Service that acquires documents for all configured sources.
pub struct DownloadService {
    client: reqwest::Client,
    status: Arc<StatusBoard>,
    data_dir: PathBuf,
    settings: DownloadSettings,
}

impl DownloadService {
    pub fn new(settings: &Settings, status: Arc<StatusBoard>) -> Result<Self, DownloadError> {
        // Connect timeout only: large transfers are retry-bounded, not
        // wall-clock-bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.download.request_timeout())
            .build()?;

        Ok(Self {
            client,
            status,
            data_dir: settings.data_dir.clone(),
            settings: settings.download.clone(),
        })
    }

    /// Acquire from every configured source, then linger and clear status.
    pub async fn run(&self) -> DownloadResult {
        self.status.begin_download();
        let mut result = DownloadResult::default();

        for source in &self.settings.sources {
            let outcome = match &source.kind {
                SourceKind::Listing { url } => self.run_listing(source, url, &mut result).await,
                SourceKind::Helper {
                    command,
                    args,
                    speed_file,
                } => self.run_helper(source, command, args, speed_file).await,
            };
            if let Err(e) = outcome {
                tracing::error!("acquisition from source '{}' failed: {}", source.subcorpus, e);
                result.failed += 1;
            }
        }

        // Hold the last sample long enough for a polling observer to see
        // the run end, then converge the published speed to zero.
        tokio::time::sleep(self.settings.linger()).await;
        self.status.finish_download();
        result
    }

    /// Scrape one listing page and fetch every new resource it links.
    async fn run_listing(
        &self,
        source: &SourceSettings,
        listing_url: &str,
        result: &mut DownloadResult,
    ) -> Result<(), DownloadError> {
        let base = Url::parse(listing_url)?;
        tracing::info!("scanning listing {}", base);

        let page = self
            .client
            .get(base.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let links = discover_links(&base, &page);
        if links.is_empty() {
            tracing::warn!("no downloadable links found at {}", base);
            return Ok(());
        }

        let dest_dir = self.data_dir.join(&source.subcorpus);
        tokio::fs::create_dir_all(&dest_dir).await?;

        for link in links {
            let Some(filename) = remote_filename(&link) else {
                tracing::warn!("cannot derive filename from {}", link);
                result.failed += 1;
                continue;
            };
            let dest = dest_dir.join(&filename);

            if already_acquired(&dest) {
                tracing::info!("skipping existing file: {}", dest.display());
                let speed = self.probe_alive(&link).await;
                self.status.set_download_speed(speed);
                result.skipped += 1;
                continue;
            }

            match self.fetch_resource(&link, &dest).await {
                Ok(()) => {
                    result.downloaded += 1;
                    if filename.ends_with(".zip") {
                        if let Err(e) = expand_archive(&dest, &dest_dir).await {
                            tracing::error!("failed to expand {}: {}", dest.display(), e);
                            result.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("download of {} failed: {}", link, e);
                    result.failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Lightweight still-alive probe for an already-acquired resource.
    ///
    /// A one-byte ranged GET; keeps the throughput telemetry a finite,
    /// non-negative number even when nothing is transferred.
    async fn probe_alive(&self, url: &Url) -> f64 {
        let started = Instant::now();
        let bytes = match self
            .client
            .get(url.clone())
            .header(reqwest::header::RANGE, "bytes=0-0")
            .send()
            .await
        {
            Ok(response) => response
                .bytes()
                .await
                .map(|body| body.len().max(1) as u64)
                .unwrap_or(0),
            Err(e) => {
                tracing::debug!("alive probe for {} failed: {}", url, e);
                0
            }
        };
        kb_per_sec(bytes, started.elapsed().as_secs_f64().max(1e-3))
    }

    /// Stream a resource to `<dest>.part`, renaming only on full success.
    async fn fetch_resource(&self, url: &Url, dest: &Path) -> Result<(), DownloadError> {
        tracing::info!("downloading {}", url);

        let part_path = part_path(dest);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(&part_path).await?;
        let mut stream = response.bytes_stream();
        let mut speedometer = Speedometer::new();

        let streamed: Result<(), DownloadError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                self.status.add_download_bytes(chunk.len() as u64);
                if let Some(speed) = speedometer.record(chunk.len() as u64) {
                    self.status.set_download_speed(speed);
                }
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = streamed {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        tokio::fs::rename(&part_path, dest).await?;
        let size = tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            "downloaded {} ({:.2} MB)",
            dest.display(),
            size as f64 / (1024.0 * 1024.0)
        );
        Ok(())
    }

    /// Run an out-of-process acquisition helper, mirroring its speed file
    /// into the status surface while it runs.
    async fn run_helper(
        &self,
        source: &SourceSettings,
        command: &str,
        args: &[String],
        speed_file: &Path,
    ) -> Result<(), DownloadError> {
        let work_dir = self.data_dir.join(&source.subcorpus);
        tokio::fs::create_dir_all(&work_dir).await?;

        tracing::info!("running acquisition helper: {}", command);
        let mut child = tokio::process::Command::new(command)
            .args(args)
            .current_dir(&work_dir)
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        // Staleness tolerance here is seconds, so polling the shared file
        // is acceptable.
        loop {
            if let Some(status) = child.try_wait()? {
                if !status.success() {
                    return Err(DownloadError::Helper(format!(
                        "{} exited with {}",
                        command, status
                    )));
                }
                break;
            }
            self.status.set_download_speed(read_speed_file(speed_file));
            tokio::time::sleep(self.settings.speed_poll()).await;
        }

        tracing::info!("acquisition helper {} completed", command);
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    dest.with_file_name(format!("{}.part", name))
}

/// Read the helper's speed file; missing or malformed reads publish zero.
fn read_speed_file(path: &Path) -> f64 {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .and_then(|value| value.get("download_speed").and_then(|v| v.as_f64()))
        .unwrap_or(0.0)
}

/// Expand a compressed bundle in place.
async fn expand_archive(archive_path: &Path, dest_dir: &Path) -> Result<(), DownloadError> {
    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();
    tracing::info!("extracting {}", archive_path.display());

    tokio::task::spawn_blocking(move || -> Result<(), DownloadError> {
        let file = std::fs::File::open(&archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        archive.extract(&dest_dir)?;
        Ok(())
    })
    .await
    .map_err(|e| DownloadError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn discovers_pdf_and_zip_links() {
        let base = Url::parse("https://archives.example.gov/releases/index.html").unwrap();
        let html = r#"
            <html><body>
                <a href="docs/release-104.pdf">Release 104</a>
                <a href="/bulk/full-set.zip">Bulk</a>
                <a href="https://other.example.gov/misc.pdf">External</a>
                <a href="docs/release-104.pdf">Duplicate</a>
                <a href="about.html">About</a>
                <a name="anchor-without-href">x</a>
            </body></html>
        "#;

        let links = discover_links(&base, html);
        let rendered: Vec<String> = links.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "https://archives.example.gov/releases/docs/release-104.pdf",
                "https://archives.example.gov/bulk/full-set.zip",
                "https://other.example.gov/misc.pdf",
            ]
        );
    }

    #[test]
    fn filename_from_url() {
        let url = Url::parse("https://a.example/b/c/release-104.pdf").unwrap();
        assert_eq!(remote_filename(&url).as_deref(), Some("release-104.pdf"));

        let bare = Url::parse("https://a.example/").unwrap();
        assert_eq!(remote_filename(&bare), None);
    }

    #[test]
    fn skip_rule_requires_non_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release-104.pdf");

        assert!(!already_acquired(&path));
        std::fs::write(&path, b"").unwrap();
        assert!(!already_acquired(&path));
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        assert!(already_acquired(&path));
    }

    #[test]
    fn throughput_is_finite_and_non_negative() {
        assert_eq!(kb_per_sec(0, 0.0), 0.0);
        assert_eq!(kb_per_sec(1024, 0.0), 0.0);
        let speed = kb_per_sec(8192, 2.0);
        assert!(speed.is_finite());
        assert!((speed - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn part_path_appends_suffix() {
        let dest = Path::new("/data/national_archives/release-104.pdf");
        assert_eq!(
            part_path(dest),
            PathBuf::from("/data/national_archives/release-104.pdf.part")
        );
    }

    #[test]
    fn speed_file_reads_are_forgiving() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speed.json");

        assert_eq!(read_speed_file(&path), 0.0);
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_speed_file(&path), 0.0);
        std::fs::write(&path, r#"{"download_speed": 512.5}"#).unwrap();
        assert_eq!(read_speed_file(&path), 512.5);
    }

    #[tokio::test]
    async fn expands_zip_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("bundle.zip");

        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("inner-doc.pdf", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"%PDF-1.4 inner").unwrap();
        writer.finish().unwrap();

        expand_archive(&zip_path, dir.path()).await.unwrap();
        let extracted = std::fs::read(dir.path().join("inner-doc.pdf")).unwrap();
        assert_eq!(extracted, b"%PDF-1.4 inner");
    }
}
