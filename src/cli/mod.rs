//! CLI commands implementation.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "recordsift")]
#[command(about = "Scanned government-document acquisition and indexing pipeline")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Acquire documents from the configured sources
    Download,

    /// Run the indexing loop over the corpus
    Index {
        /// Limit documents per cycle (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Start the HTTP query surface
    Serve {
        /// Address to bind to, overriding the configured host/port
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Search the index from the command line
    Search {
        /// Substring to match against content, location, and mission names
        query: String,
    },

    /// Show corpus and progress status
    Status,
}

/// Parse arguments and dispatch to the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::init(&settings),
        Commands::Download => commands::download(&settings).await,
        Commands::Index { limit, once } => {
            if limit > 0 {
                settings.indexing.cycle_limit = limit;
            }
            commands::index(&settings, once).await
        }
        Commands::Serve { bind } => {
            let (host, port) = match bind.as_deref() {
                Some(addr) => parse_bind(addr, settings.port)?,
                None => (settings.host.clone(), settings.port),
            };
            crate::server::serve(&settings, &host, port).await
        }
        Commands::Search { query } => commands::search(&settings, &query).await,
        Commands::Status => commands::status(&settings).await,
    }
}

/// Accept `PORT`, `HOST`, or `HOST:PORT`.
fn parse_bind(addr: &str, default_port: u16) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = addr.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("invalid port in bind address: {}", addr))?;
            Ok((host.to_string(), port))
        }
        None => Ok((addr.to_string(), default_port)),
    }
}

/// Build the shared status board for loop commands.
pub(crate) fn status_board(settings: &Settings) -> Arc<crate::services::StatusBoard> {
    Arc::new(crate::services::StatusBoard::new(
        settings.status_file_path(),
    ))
}
