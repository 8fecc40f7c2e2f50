//! # docshard CLI
//!
//! The `docshard` binary is the primary interface to the ingestion
//! pipeline.
//!
//! ## Usage
//!
//! ```bash
//! docshard --config ./config/docshard.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docshard init` | Create the SQLite database and schema |
//! | `docshard ingest <path>` | Ingest a file, or a directory recursively |
//! | `docshard list` | List ingested documents |
//! | `docshard get <id>` | Show a document's metadata and chunks |
//! | `docshard rename <id> <name>` | Rename a document |
//! | `docshard delete <id>` | Delete a document and its chunks |
//! | `docshard serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! docshard init --config ./config/docshard.toml
//!
//! # Ingest a directory with the paragraph strategy and 8 workers
//! docshard ingest ./input_docs --strategy paragraph --workers 8
//!
//! # Find documents by name
//! docshard list --search report
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use docshard::chunk::ChunkStrategy;
use docshard::config;
use docshard::db;
use docshard::ingest::{self, IngestOutcome};
use docshard::progress::ProgressMode;
use docshard::server;
use docshard::store::sqlite::SqliteStore;
use docshard::store::{DocumentStore, DocumentUpdate};

/// docshard — a document ingestion and chunking pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docshard.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docshard",
    about = "docshard — a document ingestion and chunking pipeline",
    version,
    long_about = "docshard extracts text from plain text, PDF, and DOCX files, splits it into \
    bounded-size chunks under a sentence or paragraph strategy, and persists chunks plus \
    per-document metadata in SQLite. Directories are processed in batch with per-file outcome \
    classification and an aggregate report."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docshard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and chunks
    /// tables. Idempotent — running it multiple times is safe.
    Init,

    /// Ingest a file, or a directory recursively.
    ///
    /// Every regular file under a directory is attempted exactly once and
    /// classified as succeeded, failed, or skipped; the aggregate report
    /// is printed at the end. Per-file detail goes to stderr.
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,

        /// Chunking strategy: `sentence` or `paragraph`. Defaults to the
        /// configured strategy.
        #[arg(long)]
        strategy: Option<String>,

        /// Worker pool size for directory ingestion (overrides config).
        #[arg(long)]
        workers: Option<usize>,

        /// Progress output: `off`, `human`, or `json`. Defaults to human
        /// when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// List ingested documents, newest first.
    List {
        /// Case-insensitive name filter.
        #[arg(long)]
        search: Option<String>,

        /// Maximum number of documents to show.
        #[arg(long, default_value_t = 50)]
        limit: i64,

        /// Number of documents to skip.
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Show a document's metadata and chunks.
    Get {
        /// Document UUID.
        id: String,
    },

    /// Rename a document.
    Rename {
        /// Document UUID.
        id: String,
        /// New document name. Must be unused.
        name: String,
    },

    /// Delete a document and all of its chunks.
    Delete {
        /// Document UUID.
        id: String,
    },

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// JSON API endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            SqliteStore::new(pool).migrate().await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            path,
            strategy,
            workers,
            progress,
        } => {
            let mut cfg = cfg;
            if let Some(workers) = workers {
                if workers == 0 {
                    anyhow::bail!("--workers must be >= 1");
                }
                cfg.ingest.workers = workers;
            }
            let strategy = match strategy {
                Some(s) => ChunkStrategy::from_str(&s)?,
                None => cfg.chunking.strategy,
            };
            let mode = match progress {
                Some(p) => ProgressMode::from_str(&p)?,
                None => ProgressMode::default_for_tty(),
            };
            let reporter = mode.reporter();

            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            store.migrate().await?;
            let store: Arc<dyn DocumentStore> = Arc::new(store);

            if path.is_dir() {
                let report =
                    ingest::run_batch(store, Arc::new(cfg), reporter, &path, strategy).await?;
                println!("batch complete");
                println!("  succeeded: {}", report.succeeded);
                println!("  failed:    {}", report.failed);
                println!("  skipped:   {}", report.skipped);
            } else {
                let outcome =
                    ingest::ingest_file(store.as_ref(), &cfg, reporter.as_ref(), &path, strategy)
                        .await;
                match outcome {
                    IngestOutcome::Success {
                        document_id,
                        chunk_count,
                        warnings,
                    } => {
                        println!("ingested {} ({} chunks)", document_id, chunk_count);
                        for warning in warnings {
                            eprintln!("warning: {}", warning);
                        }
                    }
                    IngestOutcome::Skipped { reason } => {
                        println!("skipped: {}", reason);
                    }
                    IngestOutcome::Failed { error } => {
                        eprintln!("Error: {}", error);
                        std::process::exit(1);
                    }
                }
            }
        }
        Commands::List {
            search,
            limit,
            offset,
        } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            store.migrate().await?;
            let docs = store.list_documents(search.as_deref(), limit, offset).await?;

            if docs.is_empty() {
                println!("no documents");
                return Ok(());
            }

            println!(
                "{:<36} {:<28} {:>5} {:>9} {:>7}  {}",
                "ID", "NAME", "FMT", "SIZE", "CHUNKS", "CREATED"
            );
            println!("{}", "-".repeat(100));
            for doc in &docs {
                println!(
                    "{:<36} {:<28} {:>5} {:>9} {:>7}  {}",
                    doc.id,
                    doc.name,
                    doc.format.as_str(),
                    format_bytes(doc.size_bytes.max(0) as u64),
                    doc.chunk_count,
                    format_ts_iso(doc.created_at)
                );
            }
        }
        Commands::Get { id } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            store.migrate().await?;

            let doc = match store.get_document(&id).await? {
                Some(doc) => doc,
                None => {
                    eprintln!("Error: document not found: {}", id);
                    std::process::exit(1);
                }
            };
            let chunks = store.get_chunks(&id).await?;

            println!("--- Document ---");
            println!("id:          {}", doc.id);
            println!("name:        {}", doc.name);
            println!("source_path: {}", doc.source_path);
            println!("format:      {}", doc.format.as_str());
            println!("size:        {}", format_bytes(doc.size_bytes.max(0) as u64));
            println!("chunk_count: {}", doc.chunk_count);
            println!("created_at:  {}", format_ts_iso(doc.created_at));
            println!();

            println!("--- Chunks ({}) ---", chunks.len());
            for chunk in &chunks {
                println!("[chunk {}]", chunk.index);
                println!("{}", chunk.content);
                println!();
            }
        }
        Commands::Rename { id, name } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            store.migrate().await?;

            let update = DocumentUpdate {
                name: Some(name.clone()),
                ..Default::default()
            };
            if store.update_document(&id, &update).await? {
                println!("renamed {} to {}", id, name);
            } else {
                eprintln!("Error: document not found: {}", id);
                std::process::exit(1);
            }
        }
        Commands::Delete { id } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            store.migrate().await?;

            if store.delete_document(&id).await? {
                println!("deleted {}", id);
            } else {
                eprintln!("Error: document not found: {}", id);
                std::process::exit(1);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
