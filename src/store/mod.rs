//! Storage abstraction for documents, chunks, and raw file bytes.
//!
//! The [`Store`] trait covers everything the ingestion and retrieval
//! pipelines need from persistence; [`ByteStore`] covers fetching uploaded
//! file content by storage key. Both are injected explicitly — lifecycle is
//! owned by the process entry point, never by a lazily-initialized global.
//!
//! Chunks are write-once/delete-only, so concurrent retrieval reads need no
//! locking: they are always consistent with whatever ingestion has committed.

pub mod memory;
pub mod sqlite;

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::{Chunk, Document};

/// Persistence operations for documents and chunks.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a freshly accepted upload record.
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Move a document to `processing`.
    async fn set_processing(&self, id: &str) -> Result<()>;

    /// Record successful ingestion: extracted text, chunk count, terminal
    /// `completed` status.
    async fn set_completed(&self, id: &str, text_content: &str, chunk_count: i64) -> Result<()>;

    /// Record terminal ingestion failure with the decoder's message.
    async fn set_failed(&self, id: &str, error: &str) -> Result<()>;

    /// Bulk-insert the chunks of one freshly ingested document.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Fetch every chunk belonging to any of the given documents, in no
    /// guaranteed order.
    async fn chunks_for_documents(&self, document_ids: &[String]) -> Result<Vec<Chunk>>;

    async fn delete_chunks_for_document(&self, document_id: &str) -> Result<()>;

    async fn delete_document(&self, id: &str) -> Result<()>;

    /// Ids of documents sitting in `pending` or `processing` whose last
    /// update is older than `cutoff` (Unix seconds), in ascending id order.
    async fn stalled_documents(&self, cutoff: i64) -> Result<Vec<String>>;
}

/// Raw file content addressed by the opaque storage key on a [`Document`].
#[async_trait]
pub trait ByteStore: Send + Sync {
    async fn fetch(&self, storage_key: &str) -> Result<Vec<u8>>;
}

/// Delete a document and everything derived from it.
///
/// Chunks go first: there is no cascading constraint at the store level, so
/// the call order is what prevents orphaned chunks pointing at a missing
/// document.
pub async fn delete_document_cascade(store: &dyn Store, id: &str) -> Result<()> {
    store.delete_chunks_for_document(id).await?;
    store.delete_document(id).await
}

/// [`ByteStore`] over a local directory; keys are paths relative to `root`.
pub struct FsByteStore {
    root: PathBuf,
}

impl FsByteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ByteStore for FsByteStore {
    async fn fetch(&self, storage_key: &str) -> Result<Vec<u8>> {
        let path = self.root.join(storage_key);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading stored file {}", path.display()))
    }
}
