//! Ingestion pipeline: raw bytes → extracted text → persisted chunks.
//!
//! Uploads are acknowledged before ingestion runs; documents are queued onto
//! background workers fed by an in-process channel, so a slow PDF never
//! blocks the upload response. Each attempt ends in a terminal status
//! (`completed` or `failed`) except when the store or byte store itself is
//! unreachable — those documents stay `pending`/`processing` and are picked
//! up again by the startup recovery sweep.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::split_text;
use crate::config::ChunkingConfig;
use crate::extract::extract_text;
use crate::models::Chunk;
use crate::store::{ByteStore, Store};

/// Run the full ingestion flow for one document.
///
/// Decoder failures on malformed files are recorded as the document's
/// terminal `failed` status and are not retried; an unsupported format is
/// not a failure — it completes with zero chunks. Errors returned from this
/// function are infrastructure errors (store or byte store unreachable) and
/// leave the document non-terminal.
pub async fn process_document(
    store: &dyn Store,
    bytes: &dyn ByteStore,
    chunking: &ChunkingConfig,
    document_id: &str,
) -> Result<()> {
    let doc = match store.get_document(document_id).await? {
        Some(doc) => doc,
        None => {
            warn!(document_id, "ingestion requested for unknown document");
            return Ok(());
        }
    };

    store.set_processing(document_id).await?;
    let raw = bytes.fetch(&doc.storage_key).await?;

    let text = match extract_text(&raw, &doc.mime_type, &doc.name) {
        Ok(text) => text,
        Err(e) => {
            let message = e.to_string();
            warn!(document_id, error = %message, "extraction failed");
            store.set_failed(document_id, &message).await?;
            return Ok(());
        }
    };

    let chunks: Vec<Chunk> = split_text(&text, chunking.chunk_size, chunking.overlap)
        .into_iter()
        .map(|slice| Chunk {
            id: Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            owner_id: doc.owner_id.clone(),
            chunk_index: slice.index,
            content: slice.content,
            char_count: slice.char_count,
        })
        .collect();

    store.insert_chunks(&chunks).await?;
    store
        .set_completed(document_id, &text, chunks.len() as i64)
        .await?;
    info!(document_id, chunks = chunks.len(), "document ingested");
    Ok(())
}

/// Handle for queueing documents onto the background ingestion workers.
///
/// Cloneable and cheap; workers exit once every handle is dropped and the
/// queue drains.
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl IngestQueue {
    /// Spawn `workers` tasks draining a shared queue.
    pub fn spawn(
        store: Arc<dyn Store>,
        bytes: Arc<dyn ByteStore>,
        chunking: ChunkingConfig,
        workers: usize,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let store = Arc::clone(&store);
            let bytes = Arc::clone(&bytes);
            let chunking = chunking.clone();
            tokio::spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(document_id) = next else { break };
                    if let Err(e) =
                        process_document(store.as_ref(), bytes.as_ref(), &chunking, &document_id)
                            .await
                    {
                        // non-terminal: the recovery sweep re-enqueues it
                        warn!(worker, document_id = %document_id, error = %e, "ingestion attempt failed");
                    }
                }
            });
        }

        Self { tx }
    }

    /// Queue a document for ingestion. Fails only when all workers are gone.
    pub fn enqueue(&self, document_id: &str) -> Result<()> {
        self.tx
            .send(document_id.to_string())
            .map_err(|_| anyhow!("ingestion workers are not running"))
    }
}

/// Re-enqueue documents stuck in `pending`/`processing` for longer than
/// `stale_after_secs`. Run once at startup, after the workers are up.
pub async fn recover_stalled(
    store: &dyn Store,
    queue: &IngestQueue,
    stale_after_secs: i64,
) -> Result<usize> {
    let cutoff = chrono::Utc::now().timestamp() - stale_after_secs;
    let ids = store.stalled_documents(cutoff).await?;
    for id in &ids {
        warn!(document_id = %id, "re-enqueueing stalled document");
        queue.enqueue(id)?;
    }
    Ok(ids.len())
}
