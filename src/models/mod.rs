//! Data models for Recordsift.

mod document;
mod status;

pub use document::{Document, DocumentMetadata, IndexedRecord};
pub use status::{DownloadProgress, IndexingProgress};
