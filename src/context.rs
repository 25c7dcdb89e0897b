//! Prompt context assembly from retrieved chunks.
//!
//! Turns the selector's relevance-ordered list into one prompt-insertable
//! block: chunks grouped by source document display name, restored to
//! document reading order within each group, with an introductory line
//! telling the model to treat the block as retrieved reference material.

use std::collections::HashMap;

use crate::models::RetrievedChunk;

const CONTEXT_INTRO: &str = "The following excerpts come from reference documents the user \
uploaded. Treat them as source material when writing the response.";

const GROUP_SEPARATOR: &str = "\n\n---\n\n";

/// Assemble the reference block. Empty input yields an empty string — the
/// caller simply omits the reference section.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    // group by display name, keeping first-appearance order
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&RetrievedChunk>> = HashMap::new();
    for chunk in chunks {
        let name = chunk.document_name.as_str();
        if !groups.contains_key(name) {
            order.push(name);
        }
        groups.entry(name).or_default().push(chunk);
    }

    let mut sections = Vec::with_capacity(order.len());
    for name in order {
        let mut group = groups.remove(name).unwrap_or_default();
        group.sort_by_key(|c| c.chunk_index);
        let body = group
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("[Source: {}]\n{}", name, body));
    }

    format!("{}\n\n{}", CONTEXT_INTRO, sections.join(GROUP_SEPARATOR))
}
