//! Lexical relevance between a query and a chunk.
//!
//! The score is the Jaccard similarity of the two normalized word sets:
//! lowercase, punctuation removed, split on whitespace, duplicates
//! collapsed. No stemming or weighting is applied.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Anything that is not a letter, number, underscore or whitespace. Combining
/// marks are stripped too, so a decomposed "cafe\u{301}" reads as "cafe".
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_\s]").expect("valid regex"));

/// The normalized word set of `text`.
pub fn word_set(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .replace_all(&lowered, "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity in `[0.0, 1.0]`; `0.0` when either side has no words.
pub fn relevance_score(query: &str, chunk_text: &str) -> f64 {
    score_sets(&word_set(query), &word_set(chunk_text))
}

pub(crate) fn score_sets(query: &HashSet<String>, chunk: &HashSet<String>) -> f64 {
    if query.is_empty() || chunk.is_empty() {
        return 0.0;
    }
    let intersection = query.intersection(chunk).count();
    let union = query.len() + chunk.len() - intersection;
    intersection as f64 / union as f64
}
