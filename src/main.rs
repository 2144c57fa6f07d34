//! # DocSage CLI (`docsage`)
//!
//! ## Usage
//!
//! ```bash
//! docsage --config ./config/docsage.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsage serve` | Start the HTTP API (and the frontend, if configured) |
//! | `docsage ask <file> "<question>"` | Ingest one file and answer a question about it |
//! | `docsage chunk <file>` | Show how a file would be chunked (no network) |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`). The Gemini key is read from `GEMINI_API_KEY`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docsage::chunk::chunk_spans;
use docsage::config;
use docsage::engine::Engine;
use docsage::extract::extract_text;
use docsage::server;
use docsage::store::DocumentStore;

/// DocSage: ask questions about a PDF or text document and get answers,
/// or chart configurations, grounded in its content.
#[derive(Parser)]
#[command(name = "docsage", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docsage.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/docsage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind`; the `PORT` environment variable overrides
    /// the port.
    Serve,

    /// Ingest a single file and answer a question about it.
    ///
    /// Prints the structured answer as JSON.
    Ask {
        /// A `.pdf` or `.txt` file.
        file: PathBuf,

        /// The question to ask.
        question: String,
    },

    /// Print the chunk boundaries for a file.
    Chunk {
        /// A `.pdf` or `.txt` file.
        file: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_document(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(extract_text(&bytes, &filename)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { file, question } => {
            let text = read_document(&file)?;
            let engine = Engine::from_config(&cfg, Arc::new(DocumentStore::new()))?;
            let report = engine.ingest(&text).await?;
            tracing::info!(chunks = report.chunk_count, "document ready");

            let answer = engine
                .answer(Some(report.document_id.as_str()), &question)
                .await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Chunk { file } => {
            let text = read_document(&file)?;
            let spans = chunk_spans(&text, cfg.chunking.window, cfg.chunking.overlap)?;
            println!(
                "{} chunk(s) (window {}, overlap {})",
                spans.len(),
                cfg.chunking.window,
                cfg.chunking.overlap
            );
            for (i, span) in spans.iter().enumerate() {
                println!(
                    "[Chunk {}] chars {}..{} ({} chars)",
                    i,
                    span.start,
                    span.end,
                    span.end - span.start
                );
            }
        }
    }

    Ok(())
}
