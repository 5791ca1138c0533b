//! Content extraction: native text layer first, bounded OCR fallback.
//!
//! The cheap path is the PDF's embedded text layer. Only when that comes
//! back empty after normalization is a bounded prefix of pages rasterized
//! and recognized, page by page, under a hard per-call timeout. Failed
//! pages are skipped, never the whole document; temp artifacts are removed
//! on every exit path.

pub mod normalize;
mod pages;
mod poppler;
mod tesseract;

pub use normalize::normalize;
pub use poppler::{PdfTextLayer, PdftoppmRasterizer};
pub use tesseract::TesseractRecognizer;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use thiserror::Error;

use crate::config::IndexingSettings;
use crate::services::retry::{with_retries, RetryPolicy};

/// Errors that can occur during content extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    #[error("external tool failed: {0}")]
    ToolFailed(String),

    #[error("rasterization produced no pages")]
    NoPages,

    #[error("no page produced recognizable text")]
    NoRecognizedText,

    #[error("recognizer timed out after {0:?}")]
    Timeout(Duration),

    #[error("recognition failed: {0}")]
    Recognize(String),

    #[error("blocking task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads the embedded text layer of a PDF without rasterizing.
pub trait TextLayer: Send + Sync {
    fn read_text(&self, pdf: &Path) -> Result<String, ExtractError>;
}

/// Opaque capability: PDF page prefix to raster images on disk.
pub trait Rasterizer: Send + Sync {
    fn rasterize_prefix(
        &self,
        pdf: &Path,
        out_dir: &Path,
        max_pages: u32,
    ) -> Result<Vec<PathBuf>, ExtractError>;
}

/// Opaque capability: raster image to recognized text.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &Path) -> Result<String, ExtractError>;
}

/// How the text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Embedded text layer, no rasterization.
    NativeText,
    /// Rasterize-and-recognize fallback.
    Ocr,
}

/// Result of a successful extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Plain text, stored verbatim; OCR output keeps its per-page
    /// structure. Normalization happens at the metadata boundary.
    pub text: String,
    pub method: ExtractionMethod,
}

/// Extraction budgets, taken from [`IndexingSettings`].
#[derive(Debug, Clone)]
struct ExtractOptions {
    page_cap: u32,
    ocr_timeout: Duration,
    ocr_attempts: u32,
    ocr_pacing: Duration,
    cleanup_grace: Duration,
    max_image_bytes: u64,
    max_image_dimension: u32,
}

impl From<&IndexingSettings> for ExtractOptions {
    fn from(settings: &IndexingSettings) -> Self {
        Self {
            page_cap: settings.page_cap,
            ocr_timeout: settings.ocr_timeout(),
            ocr_attempts: settings.ocr_attempts,
            ocr_pacing: settings.ocr_pacing(),
            cleanup_grace: settings.cleanup_grace(),
            max_image_bytes: settings.max_image_bytes,
            max_image_dimension: settings.max_image_dimension,
        }
    }
}

/// Orchestrates text-layer extraction with OCR fallback for one document.
pub struct ContentExtractor {
    text_layer: Arc<dyn TextLayer>,
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn Recognizer>,
    options: ExtractOptions,
}

impl ContentExtractor {
    /// Create an extractor wired to the system poppler and tesseract tools.
    pub fn new(settings: &IndexingSettings) -> Self {
        Self::with_backends(
            Arc::new(PdfTextLayer),
            Arc::new(PdftoppmRasterizer::default()),
            Arc::new(TesseractRecognizer::new()),
            settings,
        )
    }

    /// Create an extractor with explicit backends.
    pub fn with_backends(
        text_layer: Arc<dyn TextLayer>,
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn Recognizer>,
        settings: &IndexingSettings,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            recognizer,
            options: ExtractOptions::from(settings),
        }
    }

    /// Extract plain text from a document, or fail definitively.
    pub async fn extract(&self, pdf: &Path) -> Result<Extraction, ExtractError> {
        let text_layer = Arc::clone(&self.text_layer);
        let path = pdf.to_path_buf();
        let native = tokio::task::spawn_blocking(move || text_layer.read_text(&path))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))?;

        match native {
            Ok(raw) => {
                // Emptiness is judged on the normalized form, but the
                // stored text stays verbatim.
                if !normalize(&raw).is_empty() {
                    return Ok(Extraction {
                        text: raw.trim().to_string(),
                        method: ExtractionMethod::NativeText,
                    });
                }
                tracing::info!("{}: empty text layer, falling back to OCR", pdf.display());
            }
            Err(e) => {
                tracing::warn!(
                    "{}: text layer read failed ({}), falling back to OCR",
                    pdf.display(),
                    e
                );
            }
        }

        self.ocr_fallback(pdf).await
    }

    /// Rasterize a bounded page prefix and recognize each page.
    async fn ocr_fallback(&self, pdf: &Path) -> Result<Extraction, ExtractError> {
        let tmp = TempDir::new()?;
        let result = self.ocr_pages(pdf, tmp.path()).await;

        // Grace delay lets any in-flight filesystem handle close before the
        // rasterized artifacts are removed.
        tokio::time::sleep(self.options.cleanup_grace).await;
        if let Err(e) = tmp.close() {
            tracing::debug!("temp raster dir cleanup failed: {}", e);
        }

        result
    }

    async fn ocr_pages(&self, pdf: &Path, out_dir: &Path) -> Result<Extraction, ExtractError> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let path = pdf.to_path_buf();
        let out = out_dir.to_path_buf();
        let cap = self.options.page_cap;
        let pages = tokio::task::spawn_blocking(move || rasterizer.rasterize_prefix(&path, &out, cap))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))??;

        if pages.is_empty() {
            return Err(ExtractError::NoPages);
        }

        let retry = RetryPolicy::paced(self.options.ocr_attempts, self.options.ocr_pacing);
        let mut parts: Vec<String> = Vec::with_capacity(pages.len());

        for (index, page) in pages.iter().enumerate() {
            let page_number = index + 1;

            let check = {
                let page = page.clone();
                let max_bytes = self.options.max_image_bytes;
                let max_dimension = self.options.max_image_dimension;
                tokio::task::spawn_blocking(move || {
                    pages::validate_page_image(&page, max_bytes, max_dimension)
                })
                .await
                .map_err(|e| ExtractError::Task(e.to_string()))?
            };
            if let Err(reason) = check {
                tracing::warn!("skipping page {} of {}: {}", page_number, pdf.display(), reason);
                continue;
            }

            // Page granularity: a page that keeps failing is dropped, the
            // rest of the document still goes through.
            match with_retries(&retry, "page recognition", || {
                self.recognize_once(page.clone())
            })
            .await
            {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        parts.push(format!("Page {}:\n{}", page_number, text));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "page {} of {} skipped after retries: {}",
                        page_number,
                        pdf.display(),
                        e
                    );
                }
            }
        }

        if parts.is_empty() {
            return Err(ExtractError::NoRecognizedText);
        }

        Ok(Extraction {
            text: parts.join("\n"),
            method: ExtractionMethod::Ocr,
        })
    }

    /// One recognizer call under the hard wall-clock timeout.
    ///
    /// A timed-out blocking call is abandoned, not preempted; the worker
    /// thread finishes on its own while the pipeline moves on.
    async fn recognize_once(&self, image: PathBuf) -> Result<String, ExtractError> {
        let recognizer = Arc::clone(&self.recognizer);
        let handle = tokio::task::spawn_blocking(move || recognizer.recognize(&image));

        match tokio::time::timeout(self.options.ocr_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ExtractError::Task(e.to_string())),
            Err(_) => Err(ExtractError::Timeout(self.options.ocr_timeout)),
        }
    }
}
