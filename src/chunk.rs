//! Windowed text chunker with soft boundaries.
//!
//! Splits extracted document text into ordered, overlapping, roughly
//! fixed-size chunks for independent relevance scoring. Cut points prefer a
//! paragraph break, then a sentence end, over a hard fixed-size cut — but
//! only when the boundary falls past 30% of the window, so a stray early
//! break cannot produce a runt chunk.
//!
//! All sizes are in characters, not bytes: document text is routinely CJK.

use std::sync::OnceLock;

use regex::Regex;

/// A chunk produced by [`split_text`], before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSlice {
    /// Zero-based position within the document.
    pub index: i64,
    pub content: String,
    pub char_count: i64,
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static pattern"))
}

/// Collapse runs of three or more newlines to one paragraph break and trim
/// the ends.
pub fn clean_text(text: &str) -> String {
    blank_run_re().replace_all(text, "\n\n").trim().to_string()
}

/// Split `text` into overlapping chunks of roughly `chunk_size` characters.
///
/// Consecutive chunks share up to `overlap` characters. Empty input yields no
/// chunks; input at or under `chunk_size` yields exactly one.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkSlice> {
    let cleaned = clean_text(text);
    let chars: Vec<char> = cleaned.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= chunk_size {
        return vec![ChunkSlice {
            index: 0,
            char_count: chars.len() as i64,
            content: cleaned,
        }];
    }

    let mut chunks = Vec::new();
    let mut index = 0i64;
    let mut start = 0usize;

    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let cut = if hard_end == chars.len() {
            hard_end
        } else {
            find_boundary(&chars, start, hard_end)
        };

        let content = chars[start..cut].iter().collect::<String>();
        let content = content.trim();
        if !content.is_empty() {
            chunks.push(ChunkSlice {
                index,
                content: content.to_string(),
                char_count: content.chars().count() as i64,
            });
            index += 1;
        }

        if cut >= chars.len() {
            break;
        }
        let mut next = cut.saturating_sub(overlap);
        if next <= start {
            // overlap must never stall the walk
            next = cut;
        }
        start = next;
    }

    chunks
}

/// Pick a cut point in `chars[start..hard_end]`, preferring a paragraph
/// break, then a sentence end, over the raw window edge. Boundaries within
/// the first 30% of the window are rejected.
fn find_boundary(chars: &[char], start: usize, hard_end: usize) -> usize {
    let floor = start + (hard_end - start) * 3 / 10;

    let mut p = hard_end.saturating_sub(2);
    while p > floor {
        if chars[p] == '\n' && chars[p + 1] == '\n' {
            return p;
        }
        p -= 1;
    }

    let mut p = hard_end - 1;
    while p > floor {
        let c = chars[p];
        if matches!(c, '。' | '！' | '？') {
            return p + 1;
        }
        if matches!(c, '.' | '!' | '?') && chars.get(p + 1) == Some(&' ') {
            return p + 1;
        }
        p -= 1;
    }

    hard_end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 800, 100).is_empty());
        assert!(split_text("  \n\n  ", 800, 100).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("教学目标：认识分数。", 800, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].content, "教学目标：认识分数。");
        assert_eq!(chunks[0].char_count, 10);
    }

    #[test]
    fn blank_runs_collapse_to_paragraph_breaks() {
        assert_eq!(clean_text("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("\n\na\n\n"), "a");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn indices_are_contiguous_and_counts_match() {
        let text = "word ".repeat(500);
        let chunks = split_text(&text, 100, 20);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i as i64);
            assert_eq!(c.char_count, c.content.chars().count() as i64);
            assert!(c.content.chars().count() <= 100);
        }
    }

    #[test]
    fn prefers_paragraph_break_over_hard_cut() {
        // Break at 60% of the window beats the raw cut.
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(200));
        let chunks = split_text(&text, 100, 10);
        assert_eq!(chunks[0].content, "a".repeat(60));
    }

    #[test]
    fn rejects_paragraph_break_before_thirty_percent() {
        // Break at 10% of the window is ignored; sentence ends are absent,
        // so the first cut is the raw window edge.
        let text = format!("{}\n\n{}", "a".repeat(10), "b".repeat(300));
        let chunks = split_text(&text, 100, 10);
        assert_eq!(chunks[0].char_count, 100);
    }

    #[test]
    fn prefers_sentence_end_when_no_paragraph_break() {
        let text = format!("{}. {}", "a".repeat(70), "b".repeat(200));
        let chunks = split_text(&text, 100, 10);
        // cut lands right after the period
        assert_eq!(chunks[0].content, format!("{}.", "a".repeat(70)));
    }

    #[test]
    fn latin_sentence_end_requires_following_space() {
        // "3.14" must not be treated as a sentence boundary.
        let text = format!("{}3.14{}", "a".repeat(70), "b".repeat(200));
        let chunks = split_text(&text, 100, 10);
        assert_eq!(chunks[0].char_count, 100);
    }

    #[test]
    fn terminates_when_overlap_exceeds_chunk_size() {
        let text = "x".repeat(1000);
        let chunks = split_text(&text, 10, 50);
        // forced advance: no overlap possible, plain tiling
        assert_eq!(chunks.len(), 100);
        for c in &chunks {
            assert_eq!(c.char_count, 10);
        }
    }

    #[test]
    fn covers_the_whole_cleaned_text() {
        let text = "abcdefghij".repeat(100);
        let chunks = split_text(&text, 128, 32);
        let cleaned = clean_text(&text);
        assert!(chunks[0].content.starts_with(cleaned.chars().next().unwrap()));
        assert!(chunks.last().unwrap().content.ends_with(cleaned.chars().last().unwrap()));
        let total: i64 = chunks.iter().map(|c| c.char_count).sum();
        assert!(total >= cleaned.chars().count() as i64);
        for c in &chunks {
            assert!(cleaned.contains(&c.content));
        }
    }

    #[test]
    fn cjk_document_cuts_at_sentence_marks_with_overlap() {
        // 200 repetitions of a 7-char sentence: 1400 chars total.
        let text = "教师评语示例。".repeat(200);
        let chunks = split_text(&text, 800, 100);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.ends_with('。'));
        assert!(chunks[1].content.ends_with('。'));
        assert_eq!(chunks[0].char_count, 798);
        assert_eq!(chunks[1].char_count, 702);
        // second chunk re-covers at most `overlap` characters of the first
        let first: String = chunks[0].content.chars().skip(698).collect();
        assert!(chunks[1].content.starts_with(&first));
        assert!(first.chars().count() <= 100);
    }
}
