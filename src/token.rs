//! Tokenization for mixed Chinese/Latin/numeric text.
//!
//! No external segmenter: Latin words are lowercased runs of two or more
//! letters, digit runs are kept whole, and CJK text yields one term per
//! character plus one term per adjacent character pair. Bigrams catch common
//! two-character words; unigrams keep single characters and rare compounds
//! matchable.

use std::collections::HashSet;

/// CJK Unified Ideographs block.
fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Tokenize `text` into a flat term list, duplicates preserved.
///
/// Chunk-side tokenization must keep repetition: term frequency feeds the
/// scoring numerator and the length denominator.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    let mut terms = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_lowercase() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                i += 1;
            }
            // single letters are noise, not words
            if i - start >= 2 {
                terms.push(chars[start..i].iter().collect());
            }
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            terms.push(chars[start..i].iter().collect());
        } else if is_cjk(c) {
            terms.push(c.to_string());
            if let Some(&next) = chars.get(i + 1) {
                if is_cjk(next) {
                    terms.push([c, next].iter().collect());
                }
            }
            i += 1;
        } else {
            i += 1;
        }
    }

    terms
}

/// Tokenize a query into a term set.
///
/// Queries only need presence/absence; deduplication keeps membership tests
/// cheap.
pub fn query_terms(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}
