//! # Parley Core
//!
//! Domain types, collaborator traits, and error definitions for parley.
//! This crate has **no framework dependencies**. It defines the domain
//! model every other crate implements against.
//!
//! ## Collaborators
//!
//! The retrieval and context core consumes three seams defined here:
//! - [`Provider`]: the hosted completion service
//! - [`DocumentStore`]: documents and their chunk pools
//! - [`ConversationStore`]: conversations and stored messages

pub mod conversation;
pub mod document;
pub mod error;
pub mod id;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use conversation::{Conversation, ConversationMode, ConversationPage, ConversationStore};
pub use document::{Chunk, Document, DocumentStore, DocumentSummary, SourcedChunk};
pub use error::{Error, Result};
pub use id::{ConversationId, DocumentId, MessageId, UserId};
pub use message::{Grounding, Message, MessageMetadata, Role, StoredMessage};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
