//! SQLite-backed [`Store`] using sqlx.
//!
//! WAL journal mode, a small connection pool, and idempotent migrations run
//! explicitly at startup. The handle is constructed once by the process
//! entry point and injected wherever persistence is needed.

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::models::{Chunk, Document, DocumentStatus};

use super::Store;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path`.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create tables and indexes. Safe to run on every startup.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                mime_type TEXT NOT NULL DEFAULT '',
                storage_key TEXT NOT NULL,
                text_content TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                processing_error TEXT,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                char_count INTEGER NOT NULL,
                UNIQUE(document_id, chunk_index),
                FOREIGN KEY (document_id) REFERENCES documents(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_owner_id ON chunks(owner_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let status: String = row.get("status");
    Ok(Document {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        size_bytes: row.get("size_bytes"),
        mime_type: row.get("mime_type"),
        storage_key: row.get("storage_key"),
        text_content: row.get("text_content"),
        status: DocumentStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown document status: {}", status))?,
        processing_error: row.get("processing_error"),
        chunk_count: row.get("chunk_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents
                (id, owner_id, name, size_bytes, mime_type, storage_key,
                 text_content, status, processing_error, chunk_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.owner_id)
        .bind(&doc.name)
        .bind(doc.size_bytes)
        .bind(&doc.mime_type)
        .bind(&doc.storage_key)
        .bind(&doc.text_content)
        .bind(doc.status.as_str())
        .bind(&doc.processing_error)
        .bind(doc.chunk_count)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn set_processing(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE documents SET status = 'processing', updated_at = ? WHERE id = ?")
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_completed(&self, id: &str, text_content: &str, chunk_count: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE documents
            SET status = 'completed', text_content = ?, chunk_count = ?,
                processing_error = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(text_content)
        .bind(chunk_count)
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_failed(&self, id: &str, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE documents SET status = 'failed', processing_error = ?, updated_at = ? WHERE id = ?",
        )
        .bind(error)
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, owner_id, chunk_index, content, char_count)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(&chunk.owner_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(chunk.char_count)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn chunks_for_documents(&self, document_ids: &[String]) -> Result<Vec<Chunk>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; document_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, document_id, owner_id, chunk_index, content, char_count \
             FROM chunks WHERE document_id IN ({})",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in document_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| Chunk {
                id: row.get("id"),
                document_id: row.get("document_id"),
                owner_id: row.get("owner_id"),
                chunk_index: row.get("chunk_index"),
                content: row.get("content"),
                char_count: row.get("char_count"),
            })
            .collect())
    }

    async fn delete_chunks_for_document(&self, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn stalled_documents(&self, cutoff: i64) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT id FROM documents
            WHERE status IN ('pending', 'processing') AND updated_at < ?
            ORDER BY id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
