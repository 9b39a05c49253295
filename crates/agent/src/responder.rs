//! Completion call with a user-safe fallback.
//!
//! Provider failures never reach the conversation history. The reply is
//! replaced by [`FALLBACK_REPLY`] with zero tokens and the failure reason
//! is kept on the reply for the message metadata.

use std::sync::Arc;

use parley_core::message::Message;
use parley_core::provider::{Provider, ProviderRequest};
use tracing::{error, info};

pub const FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble generating a response right now. Please try again.";

/// Generation parameters passed with every request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// The outcome of one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub tokens_used: u32,
    pub model: String,
    pub finish_reason: Option<String>,
    /// Failure reason when the fallback text was substituted.
    pub error: Option<String>,
}

impl Reply {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Responder {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
}

impl Responder {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Send an already-fitted message list to the provider.
    pub async fn respond(&self, messages: Vec<Message>) -> Reply {
        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_output_tokens),
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let tokens_used = response.total_tokens();
                info!(
                    provider = self.provider.name(),
                    model = %response.model,
                    tokens_used,
                    "Reply generated"
                );
                let model = if response.model.is_empty() {
                    self.settings.model.clone()
                } else {
                    response.model
                };
                Reply {
                    content: response.content,
                    tokens_used,
                    model,
                    finish_reason: response.finish_reason,
                    error: None,
                }
            }
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "Completion failed, using fallback reply");
                Reply {
                    content: FALLBACK_REPLY.to_string(),
                    tokens_used: 0,
                    model: self.settings.model.clone(),
                    finish_reason: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
