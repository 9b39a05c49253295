//! Conversation aggregate and the store trait that persists it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::id::{ConversationId, UserId};
use crate::message::StoredMessage;

/// Maximum title length in characters before truncation.
const TITLE_MAX_CHARS: usize = 50;

/// How replies in a conversation are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Plain chat with the model.
    #[default]
    OpenChat,
    /// Replies grounded in the conversation's uploaded documents.
    GroundedRag,
}

/// Running totals for a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_messages: u32,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub title: String,
    pub mode: ConversationMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub stats: ConversationStats,
}

impl Conversation {
    /// Start a new conversation titled after its first message.
    pub fn new(user_id: UserId, first_message: &str, mode: ConversationMode) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            user_id,
            title: title_from(first_message),
            mode,
            created_at: now,
            updated_at: now,
            stats: ConversationStats::default(),
        }
    }
}

/// Derive a title: the message itself, or its first 50 characters plus "...".
pub fn title_from(first_message: &str) -> String {
    if first_message.chars().count() > TITLE_MAX_CHARS {
        let head: String = first_message.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        first_message.to_string()
    }
}

/// One page of a user's conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub pages: usize,
}

impl ConversationPage {
    /// Number of pages for `total` items; an empty listing still has one page.
    pub fn page_count(total: usize, limit: usize) -> usize {
        if total == 0 || limit == 0 {
            1
        } else {
            total.div_ceil(limit)
        }
    }
}

/// Persistence seam for conversations and their messages.
///
/// Implementations: in-memory (the `parley-memory` crate).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    async fn insert_conversation(&self, conversation: Conversation) -> Result<(), StoreError>;

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Conversations of `user_id`, most recently updated first.
    /// `page` is 1-based.
    async fn list_conversations(
        &self,
        user_id: &UserId,
        page: usize,
        limit: usize,
    ) -> Result<ConversationPage, StoreError>;

    async fn append_message(&self, message: StoredMessage) -> Result<(), StoreError>;

    /// All messages of a conversation ordered by sequence number.
    async fn messages(&self, id: &ConversationId) -> Result<Vec<StoredMessage>, StoreError>;

    /// Record a completed user/assistant exchange: bumps `updated_at`,
    /// adds two messages and `tokens` to the running totals.
    async fn record_exchange(&self, id: &ConversationId, tokens: u64) -> Result<(), StoreError>;

    /// Delete a conversation and its messages. Returns whether it existed.
    async fn delete_conversation(&self, id: &ConversationId) -> Result<bool, StoreError>;

    /// Connectivity check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_its_own_title() {
        assert_eq!(title_from("Hello there"), "Hello there");
    }

    #[test]
    fn long_message_title_is_truncated() {
        let msg = "a".repeat(80);
        let title = title_from(&msg);
        assert_eq!(title.len(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn title_truncation_respects_char_boundaries() {
        let msg = "é".repeat(60);
        let title = title_from(&msg);
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn page_count() {
        assert_eq!(ConversationPage::page_count(0, 20), 1);
        assert_eq!(ConversationPage::page_count(20, 20), 1);
        assert_eq!(ConversationPage::page_count(21, 20), 2);
    }

    #[test]
    fn mode_serializes_snake_case() {
        let json = serde_json::to_string(&ConversationMode::GroundedRag).unwrap();
        assert_eq!(json, "\"grounded_rag\"");
        assert_eq!(ConversationMode::default(), ConversationMode::OpenChat);
    }
}
