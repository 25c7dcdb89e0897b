//! Query-time chunk selection.
//!
//! Fetches every chunk of the requested documents in one bulk read, scores
//! each against the tokenized query, sorts into a total order, and greedily
//! accepts chunks under a count cap and a character budget. When nothing
//! scores above zero, a content-agnostic per-document sample keeps the
//! generation step grounded in *something* — newly uploaded documents earn
//! relevance only after ingestion commits their chunks.
//!
//! Never errors on an empty or unknown document set; an empty result is the
//! normal outcome, not an exception.

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::models::{Chunk, RetrievedChunk};
use crate::score::score_chunk;
use crate::store::Store;
use crate::token::query_terms;

/// Select the bounded, ranked subset of chunks to present to the model.
///
/// `document_names` maps document ids to display names; a missing entry
/// falls back to the id. Output order is selection order: relevance-ranked
/// normally, document-then-index order on the fallback path.
pub async fn retrieve_chunks(
    store: &dyn Store,
    document_ids: &[String],
    document_names: &HashMap<String, String>,
    query: &str,
    cfg: &RetrievalConfig,
) -> Result<Vec<RetrievedChunk>> {
    if document_ids.is_empty() {
        return Ok(Vec::new());
    }

    let chunks = store.chunks_for_documents(document_ids).await?;
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let terms = query_terms(query);
    let mut scored: Vec<(f64, &Chunk)> = chunks
        .iter()
        .map(|c| (score_chunk(&c.content, &terms), c))
        .collect();

    // Total order: score desc, then document id asc, then index asc. The
    // tie-break keeps output reproducible even when every score is zero,
    // and must be fully applied before the zero-score stop below.
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.document_id.cmp(&b.1.document_id))
            .then_with(|| a.1.chunk_index.cmp(&b.1.chunk_index))
    });

    let mut selected: Vec<RetrievedChunk> = Vec::new();
    let mut total_chars = 0i64;
    for (score, chunk) in &scored {
        if selected.len() >= cfg.max_chunks {
            break;
        }
        if total_chars + chunk.char_count > cfg.max_chars as i64 {
            break;
        }
        if *score <= 0.0 {
            // zero-scored chunks enter only through the fallback sample
            break;
        }
        total_chars += chunk.char_count;
        selected.push(to_retrieved(chunk, *score, document_names));
    }

    if selected.is_empty() {
        selected = fallback_sample(&chunks, document_ids, document_names, cfg);
    }

    debug!(
        candidates = chunks.len(),
        selected = selected.len(),
        "retrieval complete"
    );
    Ok(selected)
}

/// Content-agnostic sample: the first few chunks of each requested document,
/// in the caller's document order, tagged with score 0.
fn fallback_sample(
    chunks: &[Chunk],
    document_ids: &[String],
    document_names: &HashMap<String, String>,
    cfg: &RetrievalConfig,
) -> Vec<RetrievedChunk> {
    let mut by_doc: HashMap<&str, Vec<&Chunk>> = HashMap::new();
    for c in chunks {
        by_doc.entry(c.document_id.as_str()).or_default().push(c);
    }

    let mut out = Vec::new();
    let mut total_chars = 0i64;
    'documents: for id in document_ids {
        let Some(list) = by_doc.get_mut(id.as_str()) else {
            continue;
        };
        list.sort_by_key(|c| c.chunk_index);
        for chunk in list.iter().take(cfg.fallback_chunks_per_doc) {
            if out.len() >= cfg.max_chunks {
                break 'documents;
            }
            if total_chars + chunk.char_count > cfg.max_chars as i64 {
                break 'documents;
            }
            total_chars += chunk.char_count;
            out.push(to_retrieved(chunk, 0.0, document_names));
        }
    }
    out
}

fn to_retrieved(
    chunk: &Chunk,
    score: f64,
    document_names: &HashMap<String, String>,
) -> RetrievedChunk {
    RetrievedChunk {
        document_id: chunk.document_id.clone(),
        document_name: document_names
            .get(&chunk.document_id)
            .cloned()
            .unwrap_or_else(|| chunk.document_id.clone()),
        chunk_index: chunk.chunk_index,
        content: chunk.content.clone(),
        score,
    }
}
