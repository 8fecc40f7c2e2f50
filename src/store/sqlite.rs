//! SQLite [`DocumentStore`] backend.
//!
//! Documents and chunks live in two tables; the insert of a document and
//! its chunk sequence happens inside one transaction, as does the cascade
//! delete, so neither orphan chunks nor a stale `chunk_count` are ever
//! observable. `UNIQUE(name)` serializes name reservation across
//! concurrent ingestion workers.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::{Chunk, Document, DocumentFormat};

use super::{DocumentStore, DocumentUpdate, NameConflict};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the schema. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                source_path TEXT NOT NULL,
                format TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                char_count INTEGER NOT NULL,
                PRIMARY KEY (document_id, chunk_index),
                FOREIGN KEY (document_id) REFERENCES documents(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let format_str: String = row.get("format");
    let format = DocumentFormat::parse(&format_str)
        .ok_or_else(|| anyhow::anyhow!("unknown document format in store: {}", format_str))?;
    Ok(Document {
        id: row.get("id"),
        name: row.get("name"),
        source_path: row.get("source_path"),
        format,
        size_bytes: row.get("size_bytes"),
        chunk_count: row.get("chunk_count"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO documents (id, name, source_path, format, size_bytes, chunk_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(&doc.source_path)
        .bind(doc.format.as_str())
        .bind(doc.size_bytes)
        .bind(doc.chunk_count)
        .bind(doc.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(anyhow::Error::new(NameConflict(doc.name.clone())));
            }
            return Err(e.into());
        }

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (document_id, chunk_index, content, char_count) VALUES (?, ?, ?, ?)",
            )
            .bind(&chunk.document_id)
            .bind(chunk.index)
            .bind(&chunk.content)
            .bind(chunk.char_count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn name_exists(&self, name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM documents WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, name, source_path, format, size_bytes, chunk_count, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT document_id, chunk_index, content, char_count FROM chunks WHERE document_id = ? ORDER BY chunk_index ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Chunk {
                document_id: row.get("document_id"),
                index: row.get("chunk_index"),
                content: row.get("content"),
                char_count: row.get("char_count"),
            })
            .collect())
    }

    async fn list_documents(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>> {
        let rows = match search {
            Some(term) => {
                sqlx::query(
                    r#"
                    SELECT id, name, source_path, format, size_bytes, chunk_count, created_at
                    FROM documents
                    WHERE name LIKE ?
                    ORDER BY created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(format!("%{}%", term))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, name, source_path, format, size_bytes, chunk_count, created_at
                    FROM documents
                    ORDER BY created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_document).collect()
    }

    async fn update_document(&self, id: &str, update: &DocumentUpdate) -> Result<bool> {
        let Some(mut doc) = self.get_document(id).await? else {
            return Ok(false);
        };
        if let Some(name) = &update.name {
            doc.name = name.clone();
        }
        if let Some(path) = &update.source_path {
            doc.source_path = path.clone();
        }

        let result = sqlx::query("UPDATE documents SET name = ?, source_path = ? WHERE id = ?")
            .bind(&doc.name)
            .bind(&doc.source_path)
            .bind(id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(r) => Ok(r.rows_affected() > 0),
            Err(e) if is_unique_violation(&e) => Err(anyhow::Error::new(NameConflict(doc.name))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
