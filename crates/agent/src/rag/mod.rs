//! Retrieval-augmented generation building blocks.
//!
//! Documents are cut into word windows by the [`Chunker`], scored against a
//! query with [`relevance_score`], and the best windows are injected into
//! the prompt by [`augment`].

pub mod chunker;
pub mod prompt;
pub mod retriever;
pub mod scorer;

pub use chunker::Chunker;
pub use prompt::{RAG_INSTRUCTION, augment, excerpt_context};
pub use retriever::{ScoredChunk, rank, retrieve, retrieve_scored};
pub use scorer::relevance_score;
