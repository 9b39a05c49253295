//! In-memory store: conversations, messages, and documents held in
//! process for the lifetime of the server.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::conversation::{Conversation, ConversationPage, ConversationStore};
use parley_core::document::{Document, DocumentStore, DocumentSummary, SourcedChunk};
use parley_core::error::StoreError;
use parley_core::id::{ConversationId, DocumentId, UserId};
use parley_core::message::StoredMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct ConversationEntry {
    conversation: Conversation,
    messages: Vec<StoredMessage>,
}

/// An in-memory implementation of both store seams.
///
/// Cloning is cheap and clones share state, so one instance can be handed
/// out as both an `Arc<dyn ConversationStore>` and an `Arc<dyn DocumentStore>`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    conversations: Arc<RwLock<HashMap<ConversationId, ConversationEntry>>>,
    /// Upload order is preserved; chunk pools are read in this order.
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            return Err(StoreError::Duplicate(conversation.id.to_string()));
        }
        conversations.insert(
            conversation.id,
            ConversationEntry {
                conversation,
                messages: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(id).map(|e| e.conversation.clone()))
    }

    async fn list_conversations(
        &self,
        user_id: &UserId,
        page: usize,
        limit: usize,
    ) -> Result<ConversationPage, StoreError> {
        let page = page.max(1);
        let conversations = self.conversations.read().await;

        let mut owned: Vec<&Conversation> = conversations
            .values()
            .map(|e| &e.conversation)
            .filter(|c| &c.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let total = owned.len();
        let skip = (page - 1).saturating_mul(limit);
        let items = owned
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect();

        Ok(ConversationPage {
            conversations: items,
            total,
            page,
            limit,
            pages: ConversationPage::page_count(total, limit),
        })
    }

    async fn append_message(&self, message: StoredMessage) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        let entry = conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(|| StoreError::QueryFailed(format!(
                "conversation {} does not exist",
                message.conversation_id
            )))?;
        entry.messages.push(message);
        entry.messages.sort_by_key(|m| m.sequence_number);
        Ok(())
    }

    async fn messages(&self, id: &ConversationId) -> Result<Vec<StoredMessage>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(id)
            .map(|e| e.messages.clone())
            .unwrap_or_default())
    }

    async fn record_exchange(&self, id: &ConversationId, tokens: u64) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        let entry = conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::QueryFailed(format!("conversation {id} does not exist")))?;
        let conversation = &mut entry.conversation;
        conversation.stats.total_messages += 2;
        conversation.stats.total_tokens += tokens;
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<bool, StoreError> {
        Ok(self.conversations.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert_document(&self, document: Document) -> Result<DocumentId, StoreError> {
        let id = document.id;
        self.documents.write().await.push(document);
        Ok(id)
    }

    async fn chunk_pool(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<SourcedChunk>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|d| &d.conversation_id == conversation_id)
            .flat_map(|d| {
                d.chunks
                    .iter()
                    .map(|c| SourcedChunk::new(c.clone(), d.filename.clone()))
            })
            .collect())
    }

    async fn list_documents(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<DocumentSummary>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|d| &d.conversation_id == conversation_id)
            .map(Document::summary)
            .collect())
    }

    async fn delete_documents(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<usize, StoreError> {
        let mut documents = self.documents.write().await;
        let len_before = documents.len();
        documents.retain(|d| &d.conversation_id != conversation_id);
        Ok(len_before - documents.len())
    }
}
