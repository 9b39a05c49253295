//! Top-k retrieval over a conversation's chunk pool.
//!
//! Every chunk is scored against the query. Cost is linear in pool size
//! times query length; there is no index.

use parley_core::document::SourcedChunk;
use serde::Serialize;

use super::scorer::{score_sets, word_set};

/// A chunk scored against one query. Lives only for a single retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f64,
    pub chunk_id: String,
    pub source: String,
}

/// Score the whole pool and sort by descending score.
///
/// The sort is stable: equal scores keep their pool order.
pub fn rank(pool: &[SourcedChunk], query: &str) -> Vec<ScoredChunk> {
    let query_words = word_set(query);

    let mut scored: Vec<ScoredChunk> = pool
        .iter()
        .map(|sc| ScoredChunk {
            text: sc.chunk.text.clone(),
            score: score_sets(&query_words, &word_set(&sc.chunk.text)),
            chunk_id: sc.chunk.chunk_id.clone(),
            source: sc.source.clone(),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// The `top_k` best chunks with their scores.
pub fn retrieve_scored(pool: &[SourcedChunk], query: &str, top_k: usize) -> Vec<ScoredChunk> {
    let mut ranked = rank(pool, query);
    ranked.truncate(top_k);
    ranked
}

/// The texts of the `top_k` best chunks, best first.
///
/// An empty pool gives an empty result; callers answer ungrounded.
pub fn retrieve(pool: &[SourcedChunk], query: &str, top_k: usize) -> Vec<String> {
    retrieve_scored(pool, query, top_k)
        .into_iter()
        .map(|c| c.text)
        .collect()
}
