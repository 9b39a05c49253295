//! HTTP API v1: conversations, documents and context preview.
//!
//! Endpoints:
//!
//! - `POST   /v1/conversations`                 Create a conversation and answer its first message
//! - `GET    /v1/conversations?user_id=`        List a user's conversations (paginated)
//! - `GET    /v1/conversations/{id}`            Conversation with its messages
//! - `DELETE /v1/conversations/{id}`            Delete a conversation, its messages and documents
//! - `POST   /v1/conversations/{id}/messages`   Send a message, get the reply
//! - `POST   /v1/conversations/{id}/documents`  Upload a document (raw body, `?filename=`)
//! - `GET    /v1/conversations/{id}/documents`  List uploaded documents
//! - `POST   /v1/context/preview`               Show how a message list would be fitted

use axum::{
    Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use parley_agent::{ContextReport, ConversationService};
use parley_core::conversation::{Conversation, ConversationMode, ConversationPage};
use parley_core::document::DocumentSummary;
use parley_core::error::Error;
use parley_core::id::{ConversationId, UserId};
use parley_core::message::{Message, StoredMessage};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub service: Arc<ConversationService>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl ApiV1State {
    pub fn new(service: Arc<ConversationService>) -> Self {
        Self {
            service,
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedApiState = Arc<ApiV1State>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route(
            "/conversations",
            get(list_conversations_handler).post(create_conversation_handler),
        )
        .route(
            "/conversations/{id}",
            get(get_conversation_handler).delete(delete_conversation_handler),
        )
        .route("/conversations/{id}/messages", post(add_message_handler))
        .route(
            "/conversations/{id}/documents",
            get(list_documents_handler).post(upload_document_handler),
        )
        .route("/context/preview", post(context_preview_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateConversationRequest {
    user_id: String,
    first_message: String,
    #[serde(default)]
    mode: ConversationMode,
}

#[derive(Serialize, Deserialize)]
struct CreateConversationResponse {
    conversation_id: ConversationId,
    conversation: Conversation,
    user_message: StoredMessage,
    assistant_message: StoredMessage,
}

#[derive(Deserialize)]
struct ListConversationsQuery {
    user_id: String,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

#[derive(Serialize, Deserialize)]
struct ConversationDetailResponse {
    conversation: Conversation,
    messages: Vec<StoredMessage>,
}

#[derive(Deserialize)]
struct AddMessageRequest {
    content: String,
}

#[derive(Serialize, Deserialize)]
struct AddMessageResponse {
    user_message: StoredMessage,
    assistant_message: StoredMessage,
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct DocumentListResponse {
    documents: Vec<DocumentSummary>,
    count: usize,
}

#[derive(Deserialize)]
struct ContextPreviewRequest {
    messages: Vec<Message>,
    #[serde(default)]
    max_history_messages: Option<usize>,
    #[serde(default)]
    max_tokens: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct ContextPreviewResponse {
    messages: Vec<Message>,
    report: ContextReport,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a service error to a status code and JSON body.
fn to_api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) | Error::Chunking(_) | Error::Extract(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "Request failed");
    }
    api_error(status, err.to_string())
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ApiError> {
    raw.parse().map_err(to_api_error)
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse().map_err(to_api_error)
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn create_conversation_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<CreateConversationResponse>), ApiError> {
    let user_id = parse_user_id(&payload.user_id)?;
    let (conversation, user_message, assistant_message) = state
        .service
        .create_conversation(user_id, &payload.first_message, payload.mode)
        .await
        .map_err(to_api_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateConversationResponse {
            conversation_id: conversation.id,
            conversation,
            user_message,
            assistant_message,
        }),
    ))
}

async fn list_conversations_handler(
    State(state): State<SharedApiState>,
    Query(query): Query<ListConversationsQuery>,
) -> Result<Json<ConversationPage>, ApiError> {
    let user_id = parse_user_id(&query.user_id)?;
    let page = state
        .service
        .list_conversations(&user_id, query.page, query.limit)
        .await
        .map_err(to_api_error)?;
    Ok(Json(page))
}

async fn get_conversation_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetailResponse>, ApiError> {
    let id = parse_conversation_id(&id)?;
    let (conversation, messages) = state
        .service
        .get_conversation(id)
        .await
        .map_err(to_api_error)?;
    Ok(Json(ConversationDetailResponse {
        conversation,
        messages,
    }))
}

async fn delete_conversation_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_conversation_id(&id)?;
    let deleted = state
        .service
        .delete_conversation(id)
        .await
        .map_err(to_api_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(to_api_error(Error::conversation_not_found(id)))
    }
}

async fn add_message_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<AddMessageRequest>,
) -> Result<(StatusCode, Json<AddMessageResponse>), ApiError> {
    let id = parse_conversation_id(&id)?;
    let (user_message, assistant_message) = state
        .service
        .add_message(id, &payload.content)
        .await
        .map_err(to_api_error)?;
    Ok((
        StatusCode::CREATED,
        Json(AddMessageResponse {
            user_message,
            assistant_message,
        }),
    ))
}

async fn upload_document_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentSummary>), ApiError> {
    let id = parse_conversation_id(&id)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Content-Type header is required"))?;
    let filename = query.filename.unwrap_or_else(|| "document".to_string());

    let summary = state
        .service
        .upload_document(id, &filename, content_type, &body)
        .await
        .map_err(to_api_error)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn list_documents_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let id = parse_conversation_id(&id)?;
    let documents = state
        .service
        .list_documents(id)
        .await
        .map_err(to_api_error)?;
    Ok(Json(DocumentListResponse {
        count: documents.len(),
        documents,
    }))
}

async fn context_preview_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<ContextPreviewRequest>,
) -> Result<Json<ContextPreviewResponse>, ApiError> {
    let managed = state
        .service
        .preview_context(
            payload.messages,
            payload.max_history_messages,
            payload.max_tokens,
        )
        .await
        .map_err(to_api_error)?;
    Ok(Json(ContextPreviewResponse {
        messages: managed.messages,
        report: managed.report,
    }))
}
