//! Error types for the parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! converts from all of them.

use thiserror::Error;

/// The top-level error type for all parley operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Chunking errors ---
    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    // --- Extraction errors ---
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Caller-supplied input is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a missing conversation.
    pub fn conversation_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: "Conversation",
            id: id.to_string(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the completion service.
///
/// A provider never returns empty content to signal failure; it returns
/// one of these instead so the caller can substitute fallback text.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

/// Invalid chunker parameters. Raised at construction so the chunking
/// loop itself can never stall.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkingError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Document is empty")]
    Empty,

    #[error("Document exceeds size limit: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Text is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn chunking_error_names_both_values() {
        let err = Error::from(ChunkingError::OverlapTooLarge {
            chunk_size: 100,
            overlap: 100,
        });
        let text = err.to_string();
        assert!(text.contains("overlap (100)"));
        assert!(text.contains("chunk_size (100)"));
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let err = Error::conversation_not_found("abc");
        assert_eq!(err.to_string(), "Conversation not found: abc");
    }
}
