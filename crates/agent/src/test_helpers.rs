//! Shared test helpers.

use parley_core::error::ProviderError;
use parley_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::{Arc, Mutex};

use crate::context::token::{Encoding, TokenCounter};

/// Counts whitespace-separated words. Makes budget arithmetic in tests exact.
pub struct WordEncoding;

impl Encoding for WordEncoding {
    fn name(&self) -> &str {
        "words"
    }

    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

pub fn word_counter() -> TokenCounter {
    TokenCounter::new(Arc::new(WordEncoding))
}

/// A mock provider that returns scripted responses in order and records
/// every request it receives.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn repeating(text: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| make_text_response(text)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();
        if call >= responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{call}, have {})",
                responses.len()
            );
        }
        requests.push(request);
        Ok(responses[call].clone())
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status_code: 503,
            message: "service unavailable".into(),
        })
    }
}

/// A simple text response with 15 total tokens.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
        finish_reason: Some("stop".into()),
    }
}
