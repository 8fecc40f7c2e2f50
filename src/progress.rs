//! Per-file outcome and progress reporting.
//!
//! The pipeline reports what it does through an injected [`IngestReporter`]
//! capability rather than a process-global logger; front ends choose an
//! implementation (human, JSON lines, or none) and pass it into the batch
//! runner. Events are emitted on **stderr** so stdout remains parseable
//! for scripts.

use std::io::Write;

/// A single reportable event from the ingestion pipeline.
#[derive(Clone, Debug)]
pub enum IngestEvent {
    /// The batch runner started walking this root.
    Scanning { root: String },
    /// A file was ingested and persisted.
    Succeeded {
        path: String,
        document_id: String,
        chunk_count: usize,
    },
    /// A file was skipped (unsupported extension). Not a failure.
    Skipped { path: String, reason: String },
    /// A file failed. `policy` marks extractions that succeeded
    /// mechanically but yielded no usable text (scanned PDFs), as opposed
    /// to true parse or I/O errors.
    Failed {
        path: String,
        reason: String,
        policy: bool,
    },
    /// A best-effort chunk artifact write failed; the ingestion outcome is
    /// unchanged.
    Warning { path: String, message: String },
    /// The batch finished with these aggregate counters.
    Finished {
        succeeded: u64,
        failed: u64,
        skipped: u64,
    },
}

/// Receives pipeline events. Implementations write to stderr.
pub trait IngestReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Human-friendly lines on stderr.
pub struct StderrReporter;

impl IngestReporter for StderrReporter {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::Scanning { root } => format!("scan {}\n", root),
            IngestEvent::Succeeded {
                path,
                document_id,
                chunk_count,
            } => format!("ok   {}  {} chunks  ({})\n", path, chunk_count, document_id),
            IngestEvent::Skipped { path, reason } => format!("skip {}  {}\n", path, reason),
            IngestEvent::Failed {
                path,
                reason,
                policy,
            } => {
                if *policy {
                    format!("fail {}  {} — needs OCR\n", path, reason)
                } else {
                    format!("fail {}  {}\n", path, reason)
                }
            }
            IngestEvent::Warning { path, message } => format!("warn {}  {}\n", path, message),
            IngestEvent::Finished {
                succeeded,
                failed,
                skipped,
            } => format!(
                "done  succeeded: {}  failed: {}  skipped: {}\n",
                succeeded, failed, skipped
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }
}

/// Machine-readable: one JSON object per line on stderr.
pub struct JsonReporter;

impl IngestReporter for JsonReporter {
    fn report(&self, event: IngestEvent) {
        let obj = match &event {
            IngestEvent::Scanning { root } => serde_json::json!({
                "event": "scanning",
                "root": root
            }),
            IngestEvent::Succeeded {
                path,
                document_id,
                chunk_count,
            } => serde_json::json!({
                "event": "succeeded",
                "path": path,
                "document_id": document_id,
                "chunk_count": chunk_count
            }),
            IngestEvent::Skipped { path, reason } => serde_json::json!({
                "event": "skipped",
                "path": path,
                "reason": reason
            }),
            IngestEvent::Failed {
                path,
                reason,
                policy,
            } => serde_json::json!({
                "event": "failed",
                "path": path,
                "reason": reason,
                "policy": policy
            }),
            IngestEvent::Warning { path, message } => serde_json::json!({
                "event": "warning",
                "path": path,
                "message": message
            }),
            IngestEvent::Finished {
                succeeded,
                failed,
                skipped,
            } => serde_json::json!({
                "event": "finished",
                "succeeded": succeeded,
                "failed": failed,
                "skipped": skipped
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoReporter;

impl IngestReporter for NoReporter {
    fn report(&self, _event: IngestEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Builds a reporter for this mode, shareable across workers.
    pub fn reporter(&self) -> std::sync::Arc<dyn IngestReporter> {
        match self {
            ProgressMode::Off => std::sync::Arc::new(NoReporter),
            ProgressMode::Human => std::sync::Arc::new(StderrReporter),
            ProgressMode::Json => std::sync::Arc::new(JsonReporter),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!(
                "unknown progress mode: '{}'. Must be off, human, or json.",
                other
            ),
        }
    }
}
