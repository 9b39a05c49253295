//! Message domain types.
//!
//! [`Message`] is the transient role-tagged shape handed to the model.
//! [`StoredMessage`] is the persisted record of one turn in a conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{ConversationId, MessageId};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    /// Wire name of the role, as counted by the token accountant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message as sent to the completion service.
///
/// Order within a list is conversational order; roles repeat freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// How a grounded request ended up being answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grounding {
    /// Plain chat was requested.
    NotRequested,
    /// Retrieved chunks were injected into the prompt.
    Grounded,
    /// The conversation has no matching chunks; answered ungrounded.
    NoDocuments,
    /// The chunk pool could not be read; answered ungrounded.
    Failed,
}

/// Metadata attached to a stored message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Model that produced the reply (assistant messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Provider-reported finish reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Number of document excerpts injected into the prompt.
    #[serde(default)]
    pub chunks_used: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<Grounding>,

    /// Completion failure reason, when the fallback reply was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A message persisted as part of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    /// 1-based position within the conversation.
    pub sequence_number: u32,
    pub tokens_used: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl StoredMessage {
    pub fn new(
        conversation_id: ConversationId,
        role: Role,
        content: impl Into<String>,
        sequence_number: u32,
        tokens_used: u32,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role,
            content: content.into(),
            sequence_number,
            tokens_used,
            created_at: Utc::now(),
            metadata: MessageMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The model-facing view of this record.
    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}
