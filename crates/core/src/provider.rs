//! Provider trait: the abstraction over the hosted completion service.
//!
//! A Provider sends an ordered message list to an LLM and returns the
//! generated text with token usage and a finish reason. Failures are
//! reported as [`ProviderError`], never as empty content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "llama-3.3-70b-versatile", "gpt-4o")
    pub model: String,

    /// The conversation messages, already fitted to the context budget
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub content: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Why generation stopped ("stop", "length", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ProviderResponse {
    /// Total tokens billed for the call, zero when the provider omits usage.
    pub fn total_tokens(&self) -> u32 {
        self.usage.as_ref().map_or(0, |u| u.total_tokens)
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The conversation service calls `complete()` without knowing which
/// backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "groq", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_defaults() {
        let req: ProviderRequest =
            serde_json::from_str(r#"{"model":"gpt-4o","messages":[]}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn missing_usage_counts_zero_tokens() {
        let resp = ProviderResponse {
            content: "hi".into(),
            usage: None,
            model: "m".into(),
            finish_reason: None,
        };
        assert_eq!(resp.total_tokens(), 0);
    }
}
