//! # docshard
//!
//! A document ingestion and chunking pipeline.
//!
//! docshard extracts text from heterogeneous documents (plain text, PDF,
//! DOCX), splits it into bounded-size chunks under a sentence or paragraph
//! strategy, and persists chunks plus per-document metadata in SQLite for
//! later retrieval. Directories are processed in batch with per-file
//! outcome classification and an aggregate report.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌──────────┐
//! │ Batch Runner │──▶│ Ingestor           │──▶│  SQLite   │
//! │ walk + pool  │   │ extract·chunk·name │   │ docs+chks │
//! └──────────────┘   └────────────────────┘   └────┬─────┘
//!                                                  │
//!                              ┌───────────────────┤
//!                              ▼                   ▼
//!                         ┌──────────┐       ┌──────────┐
//!                         │   CLI    │       │   HTTP   │
//!                         │(docshard)│       │  (JSON)  │
//!                         └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docshard init                      # create database
//! docshard ingest ./input_docs      # ingest a directory
//! docshard list                      # list ingested documents
//! docshard get <id>                  # show a document and its chunks
//! docshard serve                     # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Format-specific text extraction |
//! | [`chunk`] | Deterministic bounded-size chunking |
//! | [`namer`] | Collision-safe document naming |
//! | [`store`] | Storage trait + SQLite and in-memory backends |
//! | [`ingest`] | Per-file ingestor and batch runner |
//! | [`progress`] | Injected outcome/progress reporting |
//! | [`server`] | Thin HTTP front end |
//! | [`db`] | Database connection |

pub mod chunk;
pub mod config;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod namer;
pub mod progress;
pub mod server;
pub mod store;
