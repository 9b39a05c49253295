//! `parley chat`: one-shot exchange, optionally grounded on a local file.

use std::path::Path;

use anyhow::Context;
use parley_agent::extract::{content_type_for_path, extract_text};
use parley_agent::rag::{augment, retrieve_scored};
use parley_agent::{Chunker, ContextManager, Responder, ServiceSettings, TokenCounter};
use parley_config::AppConfig;
use parley_core::conversation::ConversationMode;
use parley_core::document::SourcedChunk;
use parley_core::message::Message;
use tracing::{debug, warn};

pub async fn run(
    config: AppConfig,
    message: &str,
    document: Option<&Path>,
    mode: Option<ConversationMode>,
) -> anyhow::Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("message must not be empty");
    }

    let mode = mode.unwrap_or(if document.is_some() {
        ConversationMode::GroundedRag
    } else {
        ConversationMode::OpenChat
    });
    let settings = ServiceSettings::from_config(&config);
    let provider = parley_providers::build_from_config(&config)?;
    let counter = TokenCounter::for_model(config.encoding_model())?;

    let excerpts = match (mode, document) {
        (ConversationMode::GroundedRag, Some(path)) => {
            let pool = load_pool(path, &settings)?;
            let scored = retrieve_scored(&pool, message, settings.top_k);
            for hit in &scored {
                debug!(chunk_id = %hit.chunk_id, score = hit.score, "Retrieved chunk");
            }
            scored.into_iter().map(|hit| hit.text).collect()
        }
        (ConversationMode::GroundedRag, None) => {
            warn!("Grounded mode without a document; answering ungrounded");
            Vec::new()
        }
        (ConversationMode::OpenChat, _) => Vec::new(),
    };

    let messages = augment(vec![Message::user(message)], &excerpts);
    let context = ContextManager::new(
        settings.max_history_messages,
        settings.max_tokens,
        counter,
    );
    let managed = context.build_context(&messages);

    let responder = Responder::new(provider, settings.generation);
    let reply = responder.respond(managed.messages).await;

    println!("{}", reply.content);
    eprintln!(
        "\n  [{} | {} excerpt(s) | {} context tokens | {} tokens used]",
        reply.model,
        excerpts.len(),
        managed.report.tokens_after,
        reply.tokens_used
    );
    if let Some(reason) = reply.error {
        anyhow::bail!("completion failed: {reason}");
    }

    Ok(())
}

/// Extract and chunk a local file into a retrieval pool.
fn load_pool(path: &Path, settings: &ServiceSettings) -> anyhow::Result<Vec<SourcedChunk>> {
    let content_type = content_type_for_path(path)
        .with_context(|| format!("unsupported file type: {}", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if bytes.len() > settings.max_upload_bytes {
        anyhow::bail!(
            "{} is {} bytes; the limit is {}",
            path.display(),
            bytes.len(),
            settings.max_upload_bytes
        );
    }

    let text = extract_text(&bytes, content_type)?;
    let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(chunker
        .chunk(&text)
        .into_iter()
        .map(|chunk| SourcedChunk::new(chunk, source.clone()))
        .collect())
}
