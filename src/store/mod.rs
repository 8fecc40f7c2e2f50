//! Storage abstraction for the ingestion pipeline.
//!
//! The [`DocumentStore`] trait defines every operation the ingestor and
//! the front ends need, enabling pluggable backends: SQLite for the real
//! pipeline, in-memory for tests. Implementations must be `Send + Sync`
//! to work across the batch runner's worker pool.
//!
//! Document metadata and the chunk sequence are persisted through a single
//! atomic operation, so a document whose `chunk_count` disagrees with its
//! persisted chunks is never observable.

pub mod memory;
pub mod sqlite;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, Document};

/// A document insert or rename lost the name-reservation race: another
/// writer persisted the same name between the probe and the write.
#[derive(Debug)]
pub struct NameConflict(pub String);

impl fmt::Display for NameConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document name already in use: {}", self.0)
    }
}

impl std::error::Error for NameConflict {}

/// Fields a collaborator may change on an existing document. The pipeline
/// itself never mutates a document after creation.
#[derive(Debug, Default, Clone)]
pub struct DocumentUpdate {
    pub name: Option<String>,
    pub source_path: Option<String>,
}

/// Abstract persistence backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](DocumentStore::insert_document) | Persist a document and its chunks atomically |
/// | [`name_exists`](DocumentStore::name_exists) | Probe a candidate name |
/// | [`get_document`](DocumentStore::get_document) | Fetch metadata by id |
/// | [`get_chunks`](DocumentStore::get_chunks) | Fetch ordered chunks by document id |
/// | [`list_documents`](DocumentStore::list_documents) | Newest-first listing with optional name filter |
/// | [`update_document`](DocumentStore::update_document) | Rename / metadata update |
/// | [`delete_document`](DocumentStore::delete_document) | Delete a document and cascade to its chunks |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists `doc` and its ordered `chunks` as one atomic write.
    ///
    /// Fails with a [`NameConflict`] source when `doc.name` is already
    /// held by a live document.
    async fn insert_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()>;

    /// True if a live document currently holds `name`.
    async fn name_exists(&self, name: &str) -> Result<bool>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Chunks for a document ordered by index. Empty when the document is
    /// unknown.
    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// Documents newest first, optionally filtered by a case-insensitive
    /// name substring.
    async fn list_documents(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>>;

    /// Applies `update` to a document. Returns `false` when no document
    /// has this id. Renaming onto a taken name fails with [`NameConflict`].
    async fn update_document(&self, id: &str, update: &DocumentUpdate) -> Result<bool>;

    /// Deletes a document and all of its chunks. Returns `false` when no
    /// document has this id.
    async fn delete_document(&self, id: &str) -> Result<bool>;
}
