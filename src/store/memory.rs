//! In-memory [`Store`] and [`ByteStore`] implementations for tests.
//!
//! `HashMap` and `Vec` behind `std::sync::RwLock`; async methods return
//! immediately-ready futures.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Chunk, Document, DocumentStatus};

use super::{ByteStore, Store};

/// In-memory document/chunk store.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        self.docs.write().unwrap().insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.docs.read().unwrap().get(id).cloned())
    }

    async fn set_processing(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow!("document not found: {}", id))?;
        doc.status = DocumentStatus::Processing;
        doc.updated_at = Utc::now().timestamp();
        Ok(())
    }

    async fn set_completed(&self, id: &str, text_content: &str, chunk_count: i64) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow!("document not found: {}", id))?;
        doc.status = DocumentStatus::Completed;
        doc.text_content = Some(text_content.to_string());
        doc.chunk_count = chunk_count;
        doc.processing_error = None;
        doc.updated_at = Utc::now().timestamp();
        Ok(())
    }

    async fn set_failed(&self, id: &str, error: &str) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow!("document not found: {}", id))?;
        doc.status = DocumentStatus::Failed;
        doc.processing_error = Some(error.to_string());
        doc.updated_at = Utc::now().timestamp();
        Ok(())
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        self.chunks.write().unwrap().extend(chunks.iter().cloned());
        Ok(())
    }

    async fn chunks_for_documents(&self, document_ids: &[String]) -> Result<Vec<Chunk>> {
        let wanted: HashSet<&str> = document_ids.iter().map(|s| s.as_str()).collect();
        Ok(self
            .chunks
            .read()
            .unwrap()
            .iter()
            .filter(|c| wanted.contains(c.document_id.as_str()))
            .cloned()
            .collect())
    }

    async fn delete_chunks_for_document(&self, document_id: &str) -> Result<()> {
        self.chunks
            .write()
            .unwrap()
            .retain(|c| c.document_id != document_id);
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        self.docs.write().unwrap().remove(id);
        Ok(())
    }

    async fn stalled_documents(&self, cutoff: i64) -> Result<Vec<String>> {
        let docs = self.docs.read().unwrap();
        let mut ids: Vec<String> = docs
            .values()
            .filter(|d| {
                matches!(
                    d.status,
                    DocumentStatus::Pending | DocumentStatus::Processing
                ) && d.updated_at < cutoff
            })
            .map(|d| d.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-memory [`ByteStore`] keyed by storage key.
#[derive(Default)]
pub struct MemoryByteStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, storage_key: impl Into<String>, bytes: Vec<u8>) {
        self.files.write().unwrap().insert(storage_key.into(), bytes);
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    async fn fetch(&self, storage_key: &str) -> Result<Vec<u8>> {
        self.files
            .read()
            .unwrap()
            .get(storage_key)
            .cloned()
            .ok_or_else(|| anyhow!("no stored file for key: {}", storage_key))
    }
}
