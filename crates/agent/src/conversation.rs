//! The conversation service.
//!
//! Orchestrates stores, retrieval, context fitting and the completion call
//! for every conversation operation. Constructed once at startup and shared
//! behind an `Arc`; it holds no mutable state of its own.

use std::sync::Arc;

use chrono::Utc;
use parley_config::AppConfig;
use parley_core::conversation::{Conversation, ConversationMode, ConversationPage, ConversationStore};
use parley_core::document::{Document, DocumentStore, DocumentSummary};
use parley_core::error::{Error, ExtractError, Result};
use parley_core::id::{ConversationId, DocumentId, UserId};
use parley_core::message::{Grounding, Message, MessageMetadata, Role, StoredMessage};
use parley_core::provider::Provider;
use tracing::{error, info, warn};

use crate::context::{ContextManager, ManagedContext, TokenCounter};
use crate::extract;
use crate::rag::{Chunker, augment, retrieve};
use crate::responder::{GenerationSettings, Responder};

/// Largest page size accepted by [`ConversationService::list_conversations`].
pub const MAX_PAGE_LIMIT: usize = 100;

/// Tunables for the service, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub generation: GenerationSettings,
    pub max_history_messages: usize,
    pub max_tokens: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_upload_bytes: usize,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            generation: GenerationSettings {
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                max_output_tokens: config.llm.max_output_tokens,
            },
            max_history_messages: config.context.max_history_messages,
            max_tokens: config.context.max_tokens,
            chunk_size: config.context.chunk_size,
            chunk_overlap: config.context.chunk_overlap,
            top_k: config.context.top_k,
            max_upload_bytes: config.gateway.max_upload_bytes,
        }
    }
}

/// Run [`ContextManager::build_context`] on the blocking pool. Token counting
/// over a long history is CPU-bound.
async fn fit_context(manager: ContextManager, messages: Vec<Message>) -> Result<ManagedContext> {
    tokio::task::spawn_blocking(move || manager.build_context(&messages))
        .await
        .map_err(|e| Error::Internal(format!("context task failed: {e}")))
}

/// Retrieval outcome for one grounded reply.
struct Retrieval {
    excerpts: Vec<String>,
    grounding: Grounding,
}

pub struct ConversationService {
    responder: Responder,
    conversations: Arc<dyn ConversationStore>,
    documents: Arc<dyn DocumentStore>,
    context: ContextManager,
    chunker: Chunker,
    top_k: usize,
    max_upload_bytes: usize,
}

impl ConversationService {
    /// Fails when the chunking parameters are invalid.
    pub fn new(
        provider: Arc<dyn Provider>,
        conversations: Arc<dyn ConversationStore>,
        documents: Arc<dyn DocumentStore>,
        counter: TokenCounter,
        settings: ServiceSettings,
    ) -> Result<Self> {
        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;
        let context = ContextManager::new(settings.max_history_messages, settings.max_tokens, counter);
        Ok(Self {
            responder: Responder::new(provider, settings.generation),
            conversations,
            documents,
            context,
            chunker,
            top_k: settings.top_k,
            max_upload_bytes: settings.max_upload_bytes,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.responder.provider().name()
    }

    pub fn store_name(&self) -> &str {
        self.conversations.name()
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn context_manager(&self) -> &ContextManager {
        &self.context
    }

    /// Whether the conversation store answers.
    pub async fn store_healthy(&self) -> bool {
        self.conversations.ping().await.is_ok()
    }

    /// Whether the completion service answers.
    pub async fn provider_healthy(&self) -> bool {
        matches!(self.responder.provider().health_check().await, Ok(true))
    }

    /// Start a conversation and answer its first message.
    pub async fn create_conversation(
        &self,
        user_id: UserId,
        first_message: &str,
        mode: ConversationMode,
    ) -> Result<(Conversation, StoredMessage, StoredMessage)> {
        let first_message = require_content(first_message)?;
        let conversation = Conversation::new(user_id, first_message, mode);
        let id = conversation.id;
        self.conversations.insert_conversation(conversation).await?;

        let (user_message, assistant_message) =
            self.exchange(id, mode, Vec::new(), first_message, 1).await?;

        let conversation = self
            .conversations
            .get_conversation(&id)
            .await?
            .ok_or_else(|| Error::conversation_not_found(id))?;

        info!(conversation_id = %id, mode = ?mode, "Conversation created");
        Ok((conversation, user_message, assistant_message))
    }

    /// Append a user message and generate the reply.
    pub async fn add_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<(StoredMessage, StoredMessage)> {
        let content = require_content(content)?;
        let conversation = self.require_conversation(&conversation_id).await?;

        let stored = self.conversations.messages(&conversation_id).await?;
        let sequence_number = next_sequence(stored.len());
        let history: Vec<Message> = stored.iter().map(StoredMessage::to_message).collect();

        let exchange = self
            .exchange(conversation_id, conversation.mode, history, content, sequence_number)
            .await?;

        info!(conversation_id = %conversation_id, "Message added");
        Ok(exchange)
    }

    pub async fn get_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(Conversation, Vec<StoredMessage>)> {
        let conversation = self.require_conversation(&conversation_id).await?;
        let messages = self.conversations.messages(&conversation_id).await?;
        Ok((conversation, messages))
    }

    /// `page` is 1-based; `limit` must be within `1..=100`.
    pub async fn list_conversations(
        &self,
        user_id: &UserId,
        page: usize,
        limit: usize,
    ) -> Result<ConversationPage> {
        if page == 0 {
            return Err(Error::InvalidInput("page must be >= 1".into()));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(Error::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(self.conversations.list_conversations(user_id, page, limit).await?)
    }

    /// Delete a conversation with its messages and documents.
    /// Returns `false` when it did not exist.
    pub async fn delete_conversation(&self, conversation_id: ConversationId) -> Result<bool> {
        if self.conversations.get_conversation(&conversation_id).await?.is_none() {
            return Ok(false);
        }
        let documents = self.documents.delete_documents(&conversation_id).await?;
        let deleted = self.conversations.delete_conversation(&conversation_id).await?;
        info!(conversation_id = %conversation_id, documents, "Conversation deleted");
        Ok(deleted)
    }

    /// Extract, chunk and store an uploaded document.
    pub async fn upload_document(
        &self,
        conversation_id: ConversationId,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<DocumentSummary> {
        self.require_conversation(&conversation_id).await?;

        if bytes.len() > self.max_upload_bytes {
            return Err(ExtractError::TooLarge {
                size: bytes.len(),
                max: self.max_upload_bytes,
            }
            .into());
        }
        if !extract::is_supported(content_type) {
            return Err(ExtractError::UnsupportedContentType(content_type.to_string()).into());
        }
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(Error::InvalidInput("filename must not be empty".into()));
        }

        // Extraction and chunking are CPU-bound; keep them off the runtime threads.
        let chunker = self.chunker;
        let owned = bytes.to_vec();
        let mime = content_type.to_string();
        let (raw_text, chunks) = tokio::task::spawn_blocking(move || {
            let raw_text = extract::extract_text(&owned, &mime)?;
            let chunks = chunker.chunk(&raw_text);
            Ok::<_, ExtractError>((raw_text, chunks))
        })
        .await
        .map_err(|e| Error::Internal(format!("document processing task failed: {e}")))??;

        let document = Document {
            id: DocumentId::new(),
            conversation_id,
            filename: filename.to_string(),
            file_size: bytes.len(),
            content_type: extract::normalize_content_type(content_type),
            raw_text,
            chunks,
            created_at: Utc::now(),
        };
        let summary = document.summary();
        self.documents.insert_document(document).await?;

        info!(
            conversation_id = %conversation_id,
            filename = %summary.filename,
            chunks = summary.chunks_count,
            "Document processed"
        );
        Ok(summary)
    }

    pub async fn list_documents(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<DocumentSummary>> {
        self.require_conversation(&conversation_id).await?;
        Ok(self.documents.list_documents(&conversation_id).await?)
    }

    /// Fit `messages` with optional overrides of the configured limits.
    pub async fn preview_context(
        &self,
        messages: Vec<Message>,
        max_history_messages: Option<usize>,
        max_tokens: Option<usize>,
    ) -> Result<ManagedContext> {
        let max_history = max_history_messages.unwrap_or(self.context.max_history_messages());
        let max_tokens = max_tokens.unwrap_or(self.context.max_tokens());
        if max_history == 0 || max_tokens == 0 {
            return Err(Error::InvalidInput(
                "max_history_messages and max_tokens must be > 0".into(),
            ));
        }
        fit_context(self.context.with_limits(max_history, max_tokens), messages).await
    }

    async fn require_conversation(&self, id: &ConversationId) -> Result<Conversation> {
        self.conversations
            .get_conversation(id)
            .await?
            .ok_or_else(|| Error::conversation_not_found(id))
    }

    /// Store the user message, generate and store the reply, update stats.
    async fn exchange(
        &self,
        conversation_id: ConversationId,
        mode: ConversationMode,
        history: Vec<Message>,
        content: &str,
        sequence_number: u32,
    ) -> Result<(StoredMessage, StoredMessage)> {
        let user_tokens = to_u32(self.context.counter().count_tokens(content));
        let user_message =
            StoredMessage::new(conversation_id, Role::User, content, sequence_number, user_tokens);
        self.conversations.append_message(user_message.clone()).await?;

        let retrieval = match mode {
            ConversationMode::OpenChat => Retrieval {
                excerpts: Vec::new(),
                grounding: Grounding::NotRequested,
            },
            ConversationMode::GroundedRag => self.retrieve_excerpts(&conversation_id, content).await,
        };

        let mut messages = history;
        messages.push(Message::user(content));
        let messages = augment(messages, &retrieval.excerpts);
        let managed = fit_context(self.context.clone(), messages).await?;

        let reply = self.responder.respond(managed.messages).await;

        let metadata = MessageMetadata {
            model: Some(reply.model),
            finish_reason: reply.finish_reason,
            chunks_used: retrieval.excerpts.len(),
            grounding: Some(retrieval.grounding),
            error: reply.error,
        };
        let assistant_message = StoredMessage::new(
            conversation_id,
            Role::Assistant,
            reply.content,
            sequence_number + 1,
            reply.tokens_used,
        )
        .with_metadata(metadata);
        self.conversations
            .append_message(assistant_message.clone())
            .await?;

        let tokens = u64::from(user_message.tokens_used) + u64::from(assistant_message.tokens_used);
        self.conversations
            .record_exchange(&conversation_id, tokens)
            .await?;

        Ok((user_message, assistant_message))
    }

    /// Top-k excerpts for a grounded reply. Never fails: an unreadable pool
    /// and an empty pool both answer ungrounded, but are recorded differently.
    async fn retrieve_excerpts(&self, conversation_id: &ConversationId, query: &str) -> Retrieval {
        match self.documents.chunk_pool(conversation_id).await {
            Ok(pool) => {
                let excerpts = retrieve(&pool, query, self.top_k);
                if excerpts.is_empty() {
                    warn!(conversation_id = %conversation_id, "No documents found for grounded reply");
                    Retrieval {
                        excerpts,
                        grounding: Grounding::NoDocuments,
                    }
                } else {
                    info!(
                        conversation_id = %conversation_id,
                        chunks = excerpts.len(),
                        pool = pool.len(),
                        "Retrieved relevant chunks"
                    );
                    Retrieval {
                        excerpts,
                        grounding: Grounding::Grounded,
                    }
                }
            }
            Err(e) => {
                error!(conversation_id = %conversation_id, error = %e, "Chunk retrieval failed");
                Retrieval {
                    excerpts: Vec::new(),
                    grounding: Grounding::Failed,
                }
            }
        }
    }
}

fn require_content(content: &str) -> Result<&str> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("message content must not be empty".into()));
    }
    Ok(content)
}

fn next_sequence(existing: usize) -> u32 {
    to_u32(existing).saturating_add(1)
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::RAG_INSTRUCTION;
    use crate::responder::FALLBACK_REPLY;
    use crate::test_helpers::{FailingProvider, ScriptedProvider, word_counter};
    use async_trait::async_trait;
    use parley_core::error::StoreError;
    use parley_core::document::SourcedChunk;
    use parley_memory::InMemoryStore;

    fn settings() -> ServiceSettings {
        ServiceSettings {
            generation: GenerationSettings {
                model: "test-model".into(),
                temperature: 0.7,
                max_output_tokens: 256,
            },
            max_history_messages: 12,
            max_tokens: 7000,
            chunk_size: 600,
            chunk_overlap: 100,
            top_k: 3,
            max_upload_bytes: 1024,
        }
    }

    fn service_with(provider: Arc<dyn Provider>) -> (ConversationService, InMemoryStore) {
        let store = InMemoryStore::new();
        let service = ConversationService::new(
            provider,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            word_counter(),
            settings(),
        )
        .unwrap();
        (service, store)
    }

    fn alice() -> UserId {
        "alice".parse().unwrap()
    }

    #[tokio::test]
    async fn invalid_chunking_is_rejected_at_construction() {
        let store = InMemoryStore::new();
        let mut bad = settings();
        bad.chunk_overlap = bad.chunk_size;
        let result = ConversationService::new(
            Arc::new(FailingProvider),
            Arc::new(store.clone()),
            Arc::new(store),
            word_counter(),
            bad,
        );
        assert!(matches!(result, Err(Error::Chunking(_))));
    }

    #[tokio::test]
    async fn create_conversation_stores_both_messages() {
        let provider = Arc::new(ScriptedProvider::single_text("Hi Alice!"));
        let (service, _) = service_with(provider.clone());

        let (conv, user, assistant) = service
            .create_conversation(alice(), "Hello there friend", ConversationMode::OpenChat)
            .await
            .unwrap();

        assert_eq!(conv.title, "Hello there friend");
        assert_eq!(user.sequence_number, 1);
        assert_eq!(user.tokens_used, 3);
        assert_eq!(assistant.sequence_number, 2);
        assert_eq!(assistant.content, "Hi Alice!");
        assert_eq!(assistant.tokens_used, 15);
        assert_eq!(assistant.metadata.grounding, Some(Grounding::NotRequested));
        assert_eq!(conv.stats.total_messages, 2);
        assert_eq!(conv.stats.total_tokens, 18);

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages, vec![Message::user("Hello there friend")]);
    }

    #[tokio::test]
    async fn add_message_sends_prior_history() {
        let provider = Arc::new(ScriptedProvider::repeating("ok", 2));
        let (service, _) = service_with(provider.clone());

        let (conv, _, _) = service
            .create_conversation(alice(), "first", ConversationMode::OpenChat)
            .await
            .unwrap();
        let (user, assistant) = service.add_message(conv.id, "second").await.unwrap();

        assert_eq!(user.sequence_number, 3);
        assert_eq!(assistant.sequence_number, 4);
        let request = provider.last_request().unwrap();
        assert_eq!(
            request.messages,
            vec![
                Message::user("first"),
                Message::assistant("ok"),
                Message::user("second"),
            ]
        );

        let (conv, messages) = service.get_conversation(conv.id).await.unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(conv.stats.total_messages, 4);
    }

    #[tokio::test]
    async fn add_message_to_missing_conversation_is_not_found() {
        let (service, _) = service_with(Arc::new(FailingProvider));
        let err = service.add_message(ConversationId::new(), "hi").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn blank_message_is_invalid() {
        let (service, _) = service_with(Arc::new(FailingProvider));
        let err = service
            .create_conversation(alice(), "   ", ConversationMode::OpenChat)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn provider_failure_stores_fallback_reply() {
        let (service, _) = service_with(Arc::new(FailingProvider));
        let (conv, user, assistant) = service
            .create_conversation(alice(), "hello", ConversationMode::OpenChat)
            .await
            .unwrap();

        assert_eq!(assistant.content, FALLBACK_REPLY);
        assert_eq!(assistant.tokens_used, 0);
        assert!(assistant.metadata.error.is_some());
        assert_eq!(conv.stats.total_tokens, u64::from(user.tokens_used));
    }

    #[tokio::test]
    async fn grounded_reply_injects_excerpts() {
        let provider = Arc::new(ScriptedProvider::repeating("Within 30 days.", 2));
        let (service, _) = service_with(provider.clone());

        let (conv, _, _) = service
            .create_conversation(alice(), "I have questions", ConversationMode::GroundedRag)
            .await
            .unwrap();
        service
            .upload_document(
                conv.id,
                "policy.txt",
                "text/plain",
                b"Our refund policy allows returns within 30 days",
            )
            .await
            .unwrap();

        let (_, assistant) = service.add_message(conv.id, "refund policy?").await.unwrap();
        assert_eq!(assistant.metadata.chunks_used, 1);
        assert_eq!(assistant.metadata.grounding, Some(Grounding::Grounded));

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages[0], Message::system(RAG_INSTRUCTION));
        assert!(request.messages[1].content.contains("[Document Excerpt 1]\nOur refund policy"));
        assert_eq!(request.messages.last().unwrap(), &Message::user("refund policy?"));
    }

    #[tokio::test]
    async fn grounded_without_documents_falls_back_to_plain_chat() {
        let provider = Arc::new(ScriptedProvider::single_text("Sure."));
        let (service, _) = service_with(provider.clone());

        let (_, _, assistant) = service
            .create_conversation(alice(), "refund policy?", ConversationMode::GroundedRag)
            .await
            .unwrap();

        assert_eq!(assistant.metadata.chunks_used, 0);
        assert_eq!(assistant.metadata.grounding, Some(Grounding::NoDocuments));
        let request = provider.last_request().unwrap();
        assert!(request.messages.iter().all(|m| !m.is_system()));
    }

    /// Document store whose chunk pool can never be read.
    struct BrokenDocuments;

    #[async_trait]
    impl DocumentStore for BrokenDocuments {
        fn name(&self) -> &str {
            "broken"
        }
        async fn insert_document(&self, document: Document) -> std::result::Result<DocumentId, StoreError> {
            Ok(document.id)
        }
        async fn chunk_pool(
            &self,
            _: &ConversationId,
        ) -> std::result::Result<Vec<SourcedChunk>, StoreError> {
            Err(StoreError::Storage("disk on fire".into()))
        }
        async fn list_documents(
            &self,
            _: &ConversationId,
        ) -> std::result::Result<Vec<DocumentSummary>, StoreError> {
            Ok(Vec::new())
        }
        async fn delete_documents(&self, _: &ConversationId) -> std::result::Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn retrieval_failure_is_recorded_distinctly() {
        let store = InMemoryStore::new();
        let service = ConversationService::new(
            Arc::new(ScriptedProvider::single_text("Answer.")),
            Arc::new(store),
            Arc::new(BrokenDocuments),
            word_counter(),
            settings(),
        )
        .unwrap();

        let (_, _, assistant) = service
            .create_conversation(alice(), "refund?", ConversationMode::GroundedRag)
            .await
            .unwrap();
        assert_eq!(assistant.content, "Answer.");
        assert_eq!(assistant.metadata.grounding, Some(Grounding::Failed));
        assert_eq!(assistant.metadata.chunks_used, 0);
    }

    #[tokio::test]
    async fn long_history_is_windowed_before_sending() {
        let provider = Arc::new(ScriptedProvider::repeating("ok", 10));
        let store = InMemoryStore::new();
        let mut narrow = settings();
        narrow.max_history_messages = 4;
        let service = ConversationService::new(
            provider.clone(),
            Arc::new(store.clone()),
            Arc::new(store),
            word_counter(),
            narrow,
        )
        .unwrap();

        let (conv, _, _) = service
            .create_conversation(alice(), "m0", ConversationMode::OpenChat)
            .await
            .unwrap();
        for i in 1..5 {
            service.add_message(conv.id, &format!("m{i}")).await.unwrap();
        }

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages.last().unwrap(), &Message::user("m4"));
    }

    #[tokio::test]
    async fn upload_validates_type_size_and_conversation() {
        let (service, _) = service_with(Arc::new(ScriptedProvider::single_text("ok")));
        let (conv, _, _) = service
            .create_conversation(alice(), "hi", ConversationMode::OpenChat)
            .await
            .unwrap();

        let err = service
            .upload_document(conv.id, "a.png", "image/png", b"data")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extract(ExtractError::UnsupportedContentType(_))));

        let big = vec![b'a'; 2048];
        let err = service
            .upload_document(conv.id, "big.txt", "text/plain", &big)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extract(ExtractError::TooLarge { .. })));

        let err = service
            .upload_document(ConversationId::new(), "a.txt", "text/plain", b"words")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn upload_then_list_documents() {
        let (service, store) = service_with(Arc::new(ScriptedProvider::single_text("ok")));
        let (conv, _, _) = service
            .create_conversation(alice(), "hi", ConversationMode::GroundedRag)
            .await
            .unwrap();

        let summary = service
            .upload_document(conv.id, "notes.md", "text/markdown; charset=utf-8", b"# Notes\nsome words")
            .await
            .unwrap();
        assert_eq!(summary.chunks_count, 1);
        assert_eq!(summary.content_type, "text/markdown");
        assert_eq!(summary.file_size, 18);

        let docs = service.list_documents(conv.id).await.unwrap();
        assert_eq!(docs, vec![summary]);
        assert_eq!(store.document_count().await, 1);
    }

    #[tokio::test]
    async fn malformed_pdf_upload_is_rejected_and_not_stored() {
        let (service, store) = service_with(Arc::new(ScriptedProvider::single_text("ok")));
        let (conv, _, _) = service
            .create_conversation(alice(), "hi", ConversationMode::GroundedRag)
            .await
            .unwrap();

        let err = service
            .upload_document(conv.id, "broken.pdf", "application/pdf", b"%PDF-1.4 truncated")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extract(ExtractError::Pdf(_))));
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn delete_removes_documents_too() {
        let (service, store) = service_with(Arc::new(ScriptedProvider::single_text("ok")));
        let (conv, _, _) = service
            .create_conversation(alice(), "hi", ConversationMode::GroundedRag)
            .await
            .unwrap();
        service
            .upload_document(conv.id, "a.txt", "text/plain", b"alpha beta")
            .await
            .unwrap();

        assert!(service.delete_conversation(conv.id).await.unwrap());
        assert_eq!(store.document_count().await, 0);
        assert!(!service.delete_conversation(conv.id).await.unwrap());
        assert!(matches!(
            service.get_conversation(conv.id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_validates_paging() {
        let (service, _) = service_with(Arc::new(ScriptedProvider::repeating("ok", 3)));
        for msg in ["a", "b", "c"] {
            service
                .create_conversation(alice(), msg, ConversationMode::OpenChat)
                .await
                .unwrap();
        }

        let page = service.list_conversations(&alice(), 1, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        assert!(service.list_conversations(&alice(), 0, 2).await.is_err());
        assert!(service.list_conversations(&alice(), 1, 101).await.is_err());
    }

    #[tokio::test]
    async fn preview_uses_overrides() {
        let (service, _) = service_with(Arc::new(FailingProvider));
        let messages: Vec<Message> = (0..6).map(|i| Message::user(format!("m{i}"))).collect();

        let ctx = service
            .preview_context(messages.clone(), Some(2), None)
            .await
            .unwrap();
        assert_eq!(ctx.messages.len(), 2);
        assert_eq!(ctx.report.budget, 7000);
        assert!(service.preview_context(messages, None, Some(0)).await.is_err());
    }
}
