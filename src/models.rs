//! Core data models for the grounding pipeline.
//!
//! These types represent the uploaded documents, their persisted chunks, and
//! the retrieval results that flow between ingestion and generation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Characters of chunk text kept in a [`RetrievalSnapshot`] preview.
const SNAPSHOT_PREVIEW_CHARS: usize = 100;

/// Processing lifecycle of an uploaded document.
///
/// `Completed` and `Failed` are terminal; a failed document is only recovered
/// by a fresh upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DocumentStatus::Pending),
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// An uploaded reference document.
///
/// Created when an upload is accepted and mutated exactly once more, by the
/// ingestion pipeline, when extraction and chunking reach a terminal status.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    /// Display name shown to the user and used to group retrieved context.
    pub name: String,
    pub size_bytes: i64,
    /// Declared MIME type; possibly empty or wrong, the file name extension
    /// serves as a fallback format signal.
    pub mime_type: String,
    /// Opaque key understood by the byte store.
    pub storage_key: String,
    /// Full extracted text; `None` until ingestion completes.
    pub text_content: Option<String>,
    pub status: DocumentStatus,
    /// Decoder error message, preserved verbatim for operator diagnosis.
    pub processing_error: Option<String>,
    pub chunk_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document {
    /// Build a fresh document record for an accepted upload.
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        size_bytes: i64,
        mime_type: impl Into<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            storage_key: storage_key.into(),
            text_content: None,
            status: DocumentStatus::Pending,
            processing_error: None,
            chunk_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A contiguous slice of a document's extracted text.
///
/// Write-once: chunks are inserted in bulk after chunking and never mutated,
/// only deleted together with their document. Chunks for one document,
/// ordered by `chunk_index`, reconstruct the cleaned text (overlap regions
/// are duplicated by design).
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    /// Denormalized from the document so chunk queries need no join.
    pub owner_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub char_count: i64,
}

/// A chunk enriched with its relevance score and source document name.
///
/// Transient: produced fresh on every retrieval call, never persisted as-is.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: i64,
    pub content: String,
    pub score: f64,
}

/// Audit record of one retrieved chunk, stored alongside a generation result.
///
/// Purely for human traceability; nothing downstream computes from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalSnapshot {
    pub document_name: String,
    pub chunk_index: i64,
    /// Score rounded to three decimals.
    pub score: f64,
    pub preview: String,
}

impl RetrievalSnapshot {
    pub fn from_chunk(chunk: &RetrievedChunk) -> Self {
        let mut preview: String = chunk
            .content
            .chars()
            .take(SNAPSHOT_PREVIEW_CHARS)
            .collect();
        if chunk.content.chars().count() > SNAPSHOT_PREVIEW_CHARS {
            preview.push('…');
        }
        Self {
            document_name: chunk.document_name.clone(),
            chunk_index: chunk.chunk_index,
            score: (chunk.score * 1000.0).round() / 1000.0,
            preview,
        }
    }
}
