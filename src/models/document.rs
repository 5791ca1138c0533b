//! Corpus document and indexed record models.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One source PDF in the corpus.
///
/// Immutable once acquired; owned by the filesystem and referenced by
/// `stable_id` everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Deterministic identifier derived from the corpus-relative path.
    pub stable_id: String,
    /// Origin category (corpus subdirectory name).
    pub subcorpus: String,
    /// Absolute path to the PDF on disk.
    pub raw_path: PathBuf,
}

impl Document {
    /// Build a document from its subcorpus and on-disk path.
    ///
    /// The stable id is the subdirectory-qualified filename with the
    /// extension stripped and path separators flattened, so it is unique
    /// and reproducible across runs.
    pub fn new(subcorpus: &str, raw_path: PathBuf) -> Self {
        let stable_id = stable_id(subcorpus, &raw_path);
        Self {
            stable_id,
            subcorpus: subcorpus.to_string(),
            raw_path,
        }
    }

    /// Corpus-relative display name, e.g. `national_archives/doc104.pdf`.
    pub fn display_name(&self) -> String {
        let file = self
            .raw_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.subcorpus, file)
    }
}

/// Derive the stable id for a document path within a subcorpus.
pub fn stable_id(subcorpus: &str, path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}_{}", subcorpus, stem)
}

/// Structured fields derived from extracted text.
///
/// All fields are independently optional; multi-valued fields are ordered,
/// comma-joined sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub mission_names: Option<String>,
}

/// The structured indexing result for one stable id.
///
/// At most one record exists per stable id; the store upserts on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: String,
    pub filename: String,
    pub content: String,
    pub index_time: DateTime<Utc>,
    #[serde(flatten)]
    pub metadata: DocumentMetadata,
}

impl IndexedRecord {
    pub fn new(document: &Document, content: String, metadata: DocumentMetadata) -> Self {
        Self {
            id: document.stable_id.clone(),
            filename: document.display_name(),
            content,
            index_time: Utc::now(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_reproducible_and_flattened() {
        let doc = Document::new(
            "national_archives",
            PathBuf::from("/data/national_archives/docid-32112.pdf"),
        );
        assert_eq!(doc.stable_id, "national_archives_docid-32112");

        let again = Document::new(
            "national_archives",
            PathBuf::from("/data/national_archives/docid-32112.pdf"),
        );
        assert_eq!(doc, again);
    }

    #[test]
    fn stable_id_distinguishes_subcorpora() {
        let a = stable_id("national_archives", Path::new("report.pdf"));
        let b = stable_id("municipal_records", Path::new("report.pdf"));
        assert_ne!(a, b);
    }
}
