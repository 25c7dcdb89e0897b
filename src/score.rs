//! Lexical relevance scoring for one chunk against one query.
//!
//! Counts how many of the chunk's terms (occurrences included) appear in the
//! query's term set, normalized by the square root of the chunk's total term
//! count. Square-root normalization sits between a raw count, which favors
//! sheer length, and a linear mean, which buries a dense relevant region
//! inside a long chunk.
//!
//! Scores are non-negative, unbounded, and only meaningful for ranking within
//! a single retrieval call.

use std::collections::HashSet;

use crate::token::tokenize;

/// Score `content` against an already-tokenized query term set.
pub fn score_chunk(content: &str, query_terms: &HashSet<String>) -> f64 {
    let terms = tokenize(content);
    if terms.is_empty() {
        return 0.0;
    }
    let hits = terms.iter().filter(|t| query_terms.contains(t.as_str())).count();
    hits as f64 / (terms.len() as f64).sqrt()
}
