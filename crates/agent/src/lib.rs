//! The retrieval and context core of parley.
//!
//! Every reply goes through the same steps:
//!
//! 1. **Load** the conversation history from the store
//! 2. **Retrieve** the best document chunks when the conversation is grounded
//! 3. **Augment** the history with the instruction and excerpt messages
//! 4. **Fit** the list to the message-count window and token budget
//! 5. **Complete** via the provider, substituting a fallback on failure
//!
//! [`ConversationService`] wires these together over the store and
//! provider seams from `parley-core`.

pub mod context;
pub mod conversation;
pub mod extract;
pub mod rag;
pub mod responder;

#[cfg(test)]
mod test_helpers;

pub use context::{ContextManager, ContextReport, ManagedContext, TokenCounter, TokenizerError};
pub use conversation::{ConversationService, ServiceSettings};
pub use rag::{Chunker, ScoredChunk, relevance_score, retrieve};
pub use responder::{FALLBACK_REPLY, GenerationSettings, Reply, Responder};
