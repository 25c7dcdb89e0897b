//! Generation request handling.
//!
//! Consumes both pipelines: resolves display names for the referenced
//! documents, runs retrieval, prepends the assembled context block to the
//! user's prompt, calls the completion collaborator, and produces the
//! retrieval snapshots persisted alongside the generation record for audit.

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use crate::completion::CompletionClient;
use crate::config::RetrievalConfig;
use crate::context::build_context;
use crate::models::RetrievalSnapshot;
use crate::retrieve::retrieve_chunks;
use crate::store::Store;

/// One material-generation request from a teacher.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Knowledge files selected for grounding; may be empty.
    pub document_ids: Vec<String>,
    /// Text the retrieval scorer matches against — usually the topic line of
    /// the prompt, often the prompt itself.
    pub query: String,
    /// The user's own prompt, sent verbatim after the context block.
    pub prompt: String,
}

/// Completion text plus the audit snapshot of what grounded it.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub text: String,
    pub snapshots: Vec<RetrievalSnapshot>,
}

/// Run one generation request end to end.
///
/// Documents that are missing, still processing, or textless simply
/// contribute no chunks; generation proceeds either way, ungrounded if need
/// be.
pub async fn run_generation(
    store: &dyn Store,
    completions: &dyn CompletionClient,
    retrieval: &RetrievalConfig,
    request: &GenerationRequest,
) -> Result<GenerationOutcome> {
    let mut names: HashMap<String, String> = HashMap::new();
    for id in &request.document_ids {
        if let Some(doc) = store.get_document(id).await? {
            names.insert(doc.id, doc.name);
        }
    }

    let retrieved = retrieve_chunks(
        store,
        &request.document_ids,
        &names,
        &request.query,
        retrieval,
    )
    .await?;

    let context = build_context(&retrieved);
    let prompt = if context.is_empty() {
        request.prompt.clone()
    } else {
        format!("{}\n\n{}", context, request.prompt)
    };

    debug!(
        documents = request.document_ids.len(),
        retrieved = retrieved.len(),
        grounded = !context.is_empty(),
        "prompt assembled"
    );

    let text = completions.complete(&prompt).await?;
    let snapshots = retrieved.iter().map(RetrievalSnapshot::from_chunk).collect();

    Ok(GenerationOutcome { text, snapshots })
}
