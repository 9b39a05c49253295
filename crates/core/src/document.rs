//! Documents, chunks, and the document store trait.
//!
//! A [`Document`] owns the [`Chunk`]s produced from its extracted text.
//! Chunks are immutable once created and disappear only with their document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::id::{ConversationId, DocumentId};

/// A contiguous word window of a document's text, the unit of retrieval.
///
/// Invariant: `end_word - start_word == word_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable within a document (`chunk_<n>`), not globally unique.
    pub chunk_id: String,
    pub text: String,
    pub start_word: usize,
    pub end_word: usize,
    pub word_count: usize,
}

/// An uploaded document with its extracted text and chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub conversation_id: ConversationId,
    pub filename: String,
    pub file_size: usize,
    pub content_type: String,
    pub raw_text: String,
    pub chunks: Vec<Chunk>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Summary without the raw text and chunks.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            conversation_id: self.conversation_id,
            filename: self.filename.clone(),
            file_size: self.file_size,
            content_type: self.content_type.clone(),
            chunks_count: self.chunks.len(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub conversation_id: ConversationId,
    pub filename: String,
    pub file_size: usize,
    pub content_type: String,
    pub chunks_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A chunk paired with a label naming the document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedChunk {
    pub chunk: Chunk,
    pub source: String,
}

impl SourcedChunk {
    pub fn new(chunk: Chunk, source: impl Into<String>) -> Self {
        Self {
            chunk,
            source: source.into(),
        }
    }
}

/// Persistence seam for documents and their chunk pools.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    async fn insert_document(&self, document: Document) -> Result<DocumentId, StoreError>;

    /// Every chunk of every document in the conversation, in upload order
    /// then chunk order. An empty pool is a normal result.
    async fn chunk_pool(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<SourcedChunk>, StoreError>;

    async fn list_documents(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<DocumentSummary>, StoreError>;

    /// Delete all documents of a conversation, returning how many were removed.
    async fn delete_documents(&self, conversation_id: &ConversationId)
    -> Result<usize, StoreError>;
}
