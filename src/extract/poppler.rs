//! Poppler-backed text layer reading and page rasterization.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{ExtractError, Rasterizer, TextLayer};

/// Handle command output, extracting stdout on success or returning the
/// appropriate error.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractError::ToolFailed(format!(
                    "{}: {}",
                    error_prefix, stderr
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractError::Io(e)),
    }
}

/// Check command status, returning the appropriate error on failure.
fn check_cmd_status(
    result: std::io::Result<std::process::ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), ExtractError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(ExtractError::ToolFailed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractError::Io(e)),
    }
}

/// Native PDF text layer reader using `pdftotext`.
#[derive(Debug, Default)]
pub struct PdfTextLayer;

impl TextLayer for PdfTextLayer {
    fn read_text(&self, pdf: &Path) -> Result<String, ExtractError> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(pdf)
            .arg("-") // Output to stdout
            .output();

        handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")
    }
}

/// Page rasterizer using `pdftoppm`.
#[derive(Debug)]
pub struct PdftoppmRasterizer {
    /// Rasterization resolution in DPI.
    dpi: u32,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self { dpi: 300 }
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize_prefix(
        &self,
        pdf: &Path,
        out_dir: &Path,
        max_pages: u32,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let dpi = self.dpi.to_string();
        let last = max_pages.max(1).to_string();
        // -l bounds the rasterized prefix; worst-case latency and disk use
        // stay independent of document length.
        let status = Command::new("pdftoppm")
            .args(["-jpeg", "-r", &dpi, "-f", "1", "-l", &last])
            .arg(pdf)
            .arg(out_dir.join("page"))
            .status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            "pdftoppm failed to convert PDF",
        )?;

        let mut pages: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "jpg").unwrap_or(false))
            .collect();

        // pdftoppm zero-pads page numbers consistently within a run, so a
        // lexical sort is a page-order sort.
        pages.sort();
        pages.truncate(max_pages as usize);

        Ok(pages)
    }
}
