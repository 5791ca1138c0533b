//! Tesseract recognizer backend.

use std::path::Path;
use std::process::Command;

use super::{ExtractError, Recognizer};

/// Recognizer calling the system `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    lang: String,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
        }
    }
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Tesseract language.
    pub fn with_language(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &Path) -> Result<String, ExtractError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.lang])
            .output();

        match output {
            Ok(out) => {
                if out.status.success() {
                    Ok(String::from_utf8_lossy(&out.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&out.stderr);
                    Err(ExtractError::Recognize(format!(
                        "tesseract failed: {}",
                        stderr
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractError::ToolNotFound(
                "tesseract (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(ExtractError::Io(e)),
        }
    }
}
