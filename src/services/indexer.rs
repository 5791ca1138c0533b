//! The indexing loop: drives extraction, metadata derivation, and the
//! acquisition store over the corpus, cycle after cycle.
//!
//! The filesystem is the source of truth: every cycle enumerates the
//! corpus fresh. One bad document never halts a cycle, and a failed cycle
//! never halts the loop; both levels log, sleep, and carry on. Shutdown
//! is cooperative and checked between documents only.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::config::{Settings, DOCUMENT_EXTENSION};
use crate::extract::{normalize, ContentExtractor, ExtractError};
use crate::metadata;
use crate::models::{Document, IndexedRecord};
use crate::repository::{IndexRepository, RepositoryError};
use crate::services::status::StatusBoard;
use crate::storage::ExtractionCache;

/// Why a single document could not be indexed this cycle.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Per-cycle accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub total: usize,
    pub indexed: usize,
    pub already_indexed: usize,
    pub failed: usize,
}

enum DocumentOutcome {
    Indexed,
    AlreadyIndexed,
}

/// Long-running indexing worker.
pub struct IndexerService {
    repo: IndexRepository,
    cache: ExtractionCache,
    extractor: ContentExtractor,
    status: Arc<StatusBoard>,
    data_dir: PathBuf,
    subcorpora: Vec<String>,
    cycle_sleep: Duration,
    cycle_limit: usize,
}

impl IndexerService {
    /// Create an indexer wired to the system extraction tools.
    pub fn new(settings: &Settings, repo: IndexRepository, status: Arc<StatusBoard>) -> Self {
        let extractor = ContentExtractor::new(&settings.indexing);
        Self::with_extractor(settings, repo, status, extractor)
    }

    /// Create an indexer with an explicit content extractor.
    pub fn with_extractor(
        settings: &Settings,
        repo: IndexRepository,
        status: Arc<StatusBoard>,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            repo,
            cache: ExtractionCache::new(settings.cache_dir()),
            extractor,
            status,
            data_dir: settings.data_dir.clone(),
            subcorpora: settings.subcorpora.clone(),
            cycle_sleep: settings.indexing.cycle_sleep(),
            cycle_limit: settings.indexing.cycle_limit,
        }
    }

    /// Run cycles until shutdown is requested.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            tracing::info!("starting indexing cycle");
            match self.run_cycle(&shutdown).await {
                Ok(stats) => {
                    tracing::info!(
                        "cycle complete: {} indexed, {} already indexed, {} failed of {}",
                        stats.indexed,
                        stats.already_indexed,
                        stats.failed,
                        stats.total
                    );
                }
                Err(e) => {
                    tracing::error!("indexing cycle failed: {}; restarting after sleep", e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.cycle_sleep) => {}
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("indexing loop stopped");
    }

    /// One full pass over the current corpus.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> std::io::Result<CycleStats> {
        let mut documents = match self.scan_corpus() {
            Ok(documents) => documents,
            Err(e) => {
                // Clears in_progress even though the cycle never started.
                self.status.finish_cycle();
                return Err(e);
            }
        };
        if self.cycle_limit > 0 {
            documents.truncate(self.cycle_limit);
        }

        self.status.begin_cycle(documents.len());
        let mut stats = CycleStats {
            total: documents.len(),
            ..CycleStats::default()
        };

        for document in &documents {
            if *shutdown.borrow() {
                tracing::info!("shutdown requested, ending cycle early");
                break;
            }

            match self.process_document(document).await {
                Ok(DocumentOutcome::Indexed) => stats.indexed += 1,
                Ok(DocumentOutcome::AlreadyIndexed) => stats.already_indexed += 1,
                Err(e) => {
                    // Failed documents stay unindexed and are retried
                    // automatically next cycle.
                    tracing::error!(
                        "failed to index {}: {}; continuing",
                        document.display_name(),
                        e
                    );
                    stats.failed += 1;
                }
            }
            self.status.mark_processed();
        }

        self.status.finish_cycle();
        Ok(stats)
    }

    async fn process_document(&self, document: &Document) -> Result<DocumentOutcome, IndexError> {
        if self.repo.is_indexed(&document.stable_id).await? {
            tracing::debug!("skipping already indexed {}", document.display_name());
            return Ok(DocumentOutcome::AlreadyIndexed);
        }

        tracing::info!("indexing {}", document.display_name());

        let (text, freshly_extracted) = match self.cache.lookup(&document.stable_id) {
            Some(cached) => {
                tracing::debug!("reusing cached extraction for {}", document.stable_id);
                (cached, false)
            }
            None => {
                let extraction = self.extractor.extract(&document.raw_path).await?;
                (extraction.text, true)
            }
        };

        if freshly_extracted {
            // Cache failure is not fatal; the structured store is the
            // source of truth.
            if let Err(e) = self.cache.store(&document.stable_id, &text) {
                tracing::warn!("failed to cache extraction for {}: {}", document.stable_id, e);
            }
        }

        // Metadata is re-derived even for cached text; it is not assumed
        // durable just because the text is. Only the metadata input is
        // normalized; the stored content keeps its page structure.
        let meta = metadata::extract(&normalize(&text));
        let record = IndexedRecord::new(document, text, meta);
        self.repo.upsert(&record).await?;

        Ok(DocumentOutcome::Indexed)
    }

    /// Enumerate the corpus from the filesystem.
    fn scan_corpus(&self) -> std::io::Result<Vec<Document>> {
        let mut documents = Vec::new();

        for subcorpus in &self.subcorpora {
            let dir = self.data_dir.join(subcorpus);
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                let is_document = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
                    .unwrap_or(false);
                if is_document && path.is_file() {
                    documents.push(Document::new(subcorpus, path));
                }
            }
        }

        documents.sort_by(|a, b| a.stable_id.cmp(&b.stable_id));
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn scan_finds_only_pdfs_in_subcorpora() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        settings.ensure_directories().unwrap();

        let na = settings.subcorpus_dir("national_archives");
        fs::write(na.join("doc1.pdf"), b"%PDF-").unwrap();
        fs::write(na.join("doc2.PDF"), b"%PDF-").unwrap();
        fs::write(na.join("notes.txt"), b"not a document").unwrap();
        fs::write(dir.path().join("stray.pdf"), b"outside subcorpora").unwrap();

        let repo = IndexRepository::new(&settings.database_path()).unwrap();
        let indexer = IndexerService::new(&settings, repo, Arc::new(StatusBoard::in_memory()));

        let documents = indexer.scan_corpus().unwrap();
        let ids: Vec<&str> = documents.iter().map(|d| d.stable_id.as_str()).collect();
        assert_eq!(ids, vec!["national_archives_doc1", "national_archives_doc2"]);
    }
}
