//! Long-running services: acquisition, indexing, and shared status.

pub mod download;
pub mod indexer;
pub mod retry;
pub mod status;

pub use download::{DownloadResult, DownloadService};
pub use indexer::{CycleStats, IndexerService};
pub use status::StatusBoard;
