//! Command entry points.

use console::style;
use tokio::sync::watch;

use crate::config::Settings;
use crate::repository::IndexRepository;
use crate::services::{DownloadService, IndexerService};

/// Initialize the data directory, corpus subdirectories, and database.
pub fn init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    IndexRepository::new(&settings.database_path())?;

    println!(
        "{} Initialized data directory at {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    for subcorpus in &settings.subcorpora {
        println!("  {}", settings.subcorpus_dir(subcorpus).display());
    }
    println!("  database: {}", settings.database_path().display());
    Ok(())
}

/// Run one acquisition pass over all configured sources.
pub async fn download(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    if settings.download.sources.is_empty() {
        println!(
            "{} No acquisition sources configured",
            style("!").yellow()
        );
        return Ok(());
    }

    let status = super::status_board(settings);
    let service = DownloadService::new(settings, status)?;
    let result = service.run().await;

    println!(
        "{} Acquisition complete: {} downloaded, {} skipped, {} failed",
        style("✓").green(),
        result.downloaded,
        result.skipped,
        result.failed
    );
    Ok(())
}

/// Run the indexing loop, or a single cycle with `--once`.
pub async fn index(settings: &Settings, once: bool) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let repo = IndexRepository::new(&settings.database_path())?;
    let status = super::status_board(settings);
    let indexer = IndexerService::new(settings, repo, status);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    if once {
        let stats = indexer.run_cycle(&shutdown_rx).await?;
        println!(
            "{} Cycle complete: {} indexed, {} already indexed, {} failed of {}",
            style("✓").green(),
            stats.indexed,
            stats.already_indexed,
            stats.failed,
            stats.total
        );
    } else {
        println!(
            "{} Indexing loop started (Ctrl-C to stop)",
            style("▶").cyan()
        );
        indexer.run(shutdown_rx).await;
    }
    Ok(())
}

/// One-shot search against the index.
pub async fn search(settings: &Settings, query: &str) -> anyhow::Result<()> {
    let repo = IndexRepository::new(&settings.database_path())?;
    let records = repo.search(query).await?;

    if records.is_empty() {
        println!("{} No matches for '{}'", style("!").yellow(), query);
        return Ok(());
    }

    println!(
        "{} {} match(es) for '{}'",
        style("✓").green(),
        records.len(),
        query
    );
    for record in records {
        let mut annotations = Vec::new();
        if let Some(date) = &record.metadata.date {
            annotations.push(format!("date: {}", date));
        }
        if let Some(location) = &record.metadata.location {
            annotations.push(format!("location: {}", location));
        }
        if let Some(missions) = &record.metadata.mission_names {
            annotations.push(format!("missions: {}", missions));
        }

        if annotations.is_empty() {
            println!("  {}", record.filename);
        } else {
            println!("  {} ({})", record.filename, annotations.join("; "));
        }
    }
    Ok(())
}

/// Show record counts and the current progress snapshots.
pub async fn status(settings: &Settings) -> anyhow::Result<()> {
    let repo = IndexRepository::new(&settings.database_path())?;
    let board = super::status_board(settings);

    println!("Indexed documents: {}", repo.count().await?);

    let indexing = board.observed_indexing();
    if indexing.in_progress {
        println!(
            "Indexing: {}/{} files ({:.1}%)",
            indexing.files_processed, indexing.total_files, indexing.progress
        );
    } else {
        println!("Indexing: idle");
    }

    let download = board.download_snapshot();
    if download.in_progress {
        println!(
            "Download: {} bytes transferred, {:.1} KB/s",
            download.bytes_downloaded, download.download_speed
        );
    } else {
        println!("Download: idle");
    }
    Ok(())
}
