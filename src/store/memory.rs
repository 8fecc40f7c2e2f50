//! In-memory [`DocumentStore`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! The write lock makes each insert's check-name-then-write sequence a
//! single critical section, mirroring the unique constraint the SQLite
//! backend relies on.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, Document};

use super::{DocumentStore, DocumentUpdate, NameConflict};

pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        if docs.values().any(|d| d.name == doc.name) {
            return Err(anyhow::Error::new(NameConflict(doc.name.clone())));
        }
        docs.insert(doc.id.clone(), doc.clone());
        self.chunks.write().unwrap().extend_from_slice(chunks);
        Ok(())
    }

    async fn name_exists(&self, name: &str) -> Result<bool> {
        let docs = self.docs.read().unwrap();
        Ok(docs.values().any(|d| d.name == name))
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let docs = self.docs.read().unwrap();
        Ok(docs.get(id).cloned())
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().unwrap();
        let mut matching: Vec<Chunk> = chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.index);
        Ok(matching)
    }

    async fn list_documents(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>> {
        let docs = self.docs.read().unwrap();
        let needle = search.map(str::to_lowercase);
        let mut matching: Vec<Document> = docs
            .values()
            .filter(|d| match &needle {
                Some(n) => d.name.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update_document(&self, id: &str, update: &DocumentUpdate) -> Result<bool> {
        let mut docs = self.docs.write().unwrap();
        if !docs.contains_key(id) {
            return Ok(false);
        }
        if let Some(name) = &update.name {
            if docs.values().any(|d| d.id != id && d.name == *name) {
                return Err(anyhow::Error::new(NameConflict(name.clone())));
            }
        }
        let doc = docs.get_mut(id).expect("checked above");
        if let Some(name) = &update.name {
            doc.name = name.clone();
        }
        if let Some(path) = &update.source_path {
            doc.source_path = path.clone();
        }
        Ok(true)
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut docs = self.docs.write().unwrap();
        if docs.remove(id).is_none() {
            return Ok(false);
        }
        self.chunks.write().unwrap().retain(|c| c.document_id != id);
        Ok(true)
    }
}
