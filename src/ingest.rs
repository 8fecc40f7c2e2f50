//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow for one document: extension dispatch → extraction
//! → chunking → collision-safe naming → atomic persistence, plus
//! best-effort chunk artifact materialization. The batch runner walks a
//! directory tree and drives per-file ingestion across a bounded worker
//! pool, classifying every file as succeeded, failed, or skipped.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::chunk::{chunk_text, ChunkStrategy};
use crate::config::Config;
use crate::extract::{self, ExtractError};
use crate::models::{Chunk, Document, DocumentFormat};
use crate::namer;
use crate::progress::{IngestEvent, IngestReporter};
use crate::store::{DocumentStore, NameConflict};

/// Insert attempts before giving up when concurrent ingestions keep
/// winning the same candidate name.
const NAME_RESERVE_ATTEMPTS: usize = 3;

/// Classified result of ingesting one file.
#[derive(Debug)]
pub enum IngestOutcome {
    Success {
        document_id: String,
        chunk_count: usize,
        /// Best-effort artifact writes that failed. Never changes the
        /// outcome; surfaced so callers and tests can observe them.
        warnings: Vec<String>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: IngestFailure,
    },
}

/// Why a file failed. Policy failures (no extractable text) are counted
/// as failures but reported distinctly from true errors, so operators can
/// route scanned documents to an OCR pipeline.
#[derive(Debug)]
pub enum IngestFailure {
    NoExtractableText,
    Extraction(ExtractError),
    Store(anyhow::Error),
}

impl IngestFailure {
    pub fn is_policy(&self) -> bool {
        matches!(self, IngestFailure::NoExtractableText)
    }
}

impl fmt::Display for IngestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestFailure::NoExtractableText => {
                write!(f, "no extractable text layer (scanned document?)")
            }
            IngestFailure::Extraction(e) => write!(f, "{}", e),
            IngestFailure::Store(e) => write!(f, "store rejected write: {}", e),
        }
    }
}

/// Aggregate counters for one batch run. Commutative across workers; the
/// three counters sum to the number of regular files visited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Ingests a single file and reports the outcome.
pub async fn ingest_file(
    store: &dyn DocumentStore,
    config: &Config,
    reporter: &dyn IngestReporter,
    path: &Path,
    strategy: ChunkStrategy,
) -> IngestOutcome {
    let outcome = ingest_inner(store, config, path, strategy).await;
    report_outcome(reporter, path, &outcome);
    outcome
}

async fn ingest_inner(
    store: &dyn DocumentStore,
    config: &Config,
    path: &Path,
    strategy: ChunkStrategy,
) -> IngestOutcome {
    let Some(format) = DocumentFormat::from_path(path) else {
        return IngestOutcome::Skipped {
            reason: "unsupported format".to_string(),
        };
    };

    let extraction = match extract::extract(path, format) {
        Ok(e) => e,
        Err(ExtractError::NoTextLayer) => {
            return IngestOutcome::Failed {
                error: IngestFailure::NoExtractableText,
            }
        }
        Err(e) => {
            return IngestOutcome::Failed {
                error: IngestFailure::Extraction(e),
            }
        }
    };

    let pieces = chunk_text(&extraction.content, strategy, config.chunking.max_chars);

    let candidate = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let doc = match persist(store, path, format, extraction.size_bytes, &pieces, &candidate).await {
        Ok(doc) => doc,
        Err(e) => {
            return IngestOutcome::Failed {
                error: IngestFailure::Store(e),
            }
        }
    };

    let warnings = if config.ingest.materialize {
        materialize_chunks(&config.ingest.output_root, &doc.name, strategy, &pieces)
    } else {
        Vec::new()
    };

    IngestOutcome::Success {
        document_id: doc.id,
        chunk_count: pieces.len(),
        warnings,
    }
}

/// Probe-then-insert, retried: the store's unique name constraint is the
/// arbiter when two workers race for the same candidate.
async fn persist(
    store: &dyn DocumentStore,
    path: &Path,
    format: DocumentFormat,
    size_bytes: u64,
    pieces: &[String],
    candidate: &str,
) -> Result<Document> {
    for _ in 0..NAME_RESERVE_ATTEMPTS {
        let name = namer::unique_name(store, candidate).await?;
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            name,
            source_path: path.display().to_string(),
            format,
            size_bytes: size_bytes as i64,
            chunk_count: pieces.len() as i64,
            created_at: chrono::Utc::now().timestamp(),
        };
        let chunks: Vec<Chunk> = pieces
            .iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                document_id: doc.id.clone(),
                index: i as i64,
                content: content.clone(),
                char_count: content.chars().count() as i64,
            })
            .collect();

        match store.insert_document(&doc, &chunks).await {
            Ok(()) => return Ok(doc),
            Err(e) if e.downcast_ref::<NameConflict>().is_some() => continue,
            Err(e) => return Err(e),
        }
    }
    bail!("could not reserve a unique name for {}", candidate)
}

/// Writes each chunk as `chunk_<i>` under a per-document directory named
/// from the sanitized document name and the strategy. Failures become
/// warnings, never a changed outcome.
fn materialize_chunks(
    output_root: &Path,
    doc_name: &str,
    strategy: ChunkStrategy,
    pieces: &[String],
) -> Vec<String> {
    let mut warnings = Vec::new();
    let dir = output_root.join(format!(
        "{}_{}_chunks",
        doc_name.replace('.', "_"),
        strategy.as_str()
    ));
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warnings.push(format!(
            "could not create artifact directory {}: {}",
            dir.display(),
            e
        ));
        return warnings;
    }
    for (i, content) in pieces.iter().enumerate() {
        let chunk_path = dir.join(format!("chunk_{}", i));
        if let Err(e) = std::fs::write(&chunk_path, content) {
            warnings.push(format!("could not write {}: {}", chunk_path.display(), e));
        }
    }
    warnings
}

fn report_outcome(reporter: &dyn IngestReporter, path: &Path, outcome: &IngestOutcome) {
    let path_str = path.display().to_string();
    match outcome {
        IngestOutcome::Success {
            document_id,
            chunk_count,
            warnings,
        } => {
            reporter.report(IngestEvent::Succeeded {
                path: path_str.clone(),
                document_id: document_id.clone(),
                chunk_count: *chunk_count,
            });
            for warning in warnings {
                reporter.report(IngestEvent::Warning {
                    path: path_str.clone(),
                    message: warning.clone(),
                });
            }
        }
        IngestOutcome::Skipped { reason } => {
            reporter.report(IngestEvent::Skipped {
                path: path_str,
                reason: reason.clone(),
            });
        }
        IngestOutcome::Failed { error } => {
            reporter.report(IngestEvent::Failed {
                path: path_str,
                reason: error.to_string(),
                policy: error.is_policy(),
            });
        }
    }
}

/// Walks `root` recursively and ingests every regular file exactly once,
/// dispatching across a bounded worker pool. Per-file failures never halt
/// the walk; a missing root is the single top-level error and leaves all
/// counters untouched.
pub async fn run_batch(
    store: Arc<dyn DocumentStore>,
    config: Arc<Config>,
    reporter: Arc<dyn IngestReporter>,
    root: &Path,
    strategy: ChunkStrategy,
) -> Result<BatchReport> {
    if !root.is_dir() {
        bail!("input directory not found: {}", root.display());
    }

    reporter.report(IngestEvent::Scanning {
        root: root.display().to_string(),
    });

    let exclude = build_globset(&config.ingest.exclude_globs)?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                reporter.report(IngestEvent::Warning {
                    path: e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string()),
                    message: format!("walk error: {}", e),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if exclude.is_match(relative) {
            continue;
        }
        files.push(entry.path().to_path_buf());
    }

    let semaphore = Arc::new(Semaphore::new(config.ingest.workers.max(1)));
    let mut tasks = JoinSet::new();
    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let store = store.clone();
        let config = config.clone();
        let reporter = reporter.clone();
        tasks.spawn(async move {
            let _permit = permit;
            ingest_file(store.as_ref(), &config, reporter.as_ref(), &path, strategy).await
        });
    }

    let mut report = BatchReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined.context("ingestion worker panicked")? {
            IngestOutcome::Success { .. } => report.succeeded += 1,
            IngestOutcome::Failed { .. } => report.failed += 1,
            IngestOutcome::Skipped { .. } => report.skipped += 1,
        }
    }

    reporter.report(IngestEvent::Finished {
        succeeded: report.succeeded,
        failed: report.failed,
        skipped: report.skipped,
    });

    Ok(report)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
