//! Token accounting.
//!
//! One encoding is resolved at startup and shared by every count, so
//! numbers are comparable across calls. Message lists are costed with an
//! additive model: each message pays a fixed overhead plus the tokens of
//! its role and content, and the list as a whole pays a fixed overhead.
//! This approximates chat-format wrapping; it is not meant to match any
//! particular model's billing exactly.

use std::fmt;
use std::sync::Arc;

use parley_core::message::Message;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Tokens added per message for role and formatting markers.
pub const MESSAGE_OVERHEAD: usize = 4;

/// Tokens added once per message list.
pub const CONVERSATION_OVERHEAD: usize = 2;

/// Encoding used when the configured model has no known tokenizer.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// A text encoding that can count tokens.
pub trait Encoding: Send + Sync {
    fn name(&self) -> &str;

    fn count(&self, text: &str) -> usize;
}

/// BPE encoding backed by `tiktoken-rs`.
pub struct BpeEncoding {
    name: String,
    bpe: CoreBPE,
}

impl BpeEncoding {
    /// Resolve the tokenizer for `model`, falling back to [`DEFAULT_ENCODING`].
    ///
    /// The fallback is logged once here, at construction.
    pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => {
                debug!(model, "Resolved tokenizer for model");
                Ok(Self {
                    name: model.to_string(),
                    bpe,
                })
            }
            Err(_) => {
                warn!(model, fallback = DEFAULT_ENCODING, "Unknown model for tokenizer, using fallback encoding");
                Self::default_encoding()
            }
        }
    }

    /// The general-purpose default encoding.
    pub fn default_encoding() -> Result<Self, TokenizerError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| TokenizerError::Load {
            encoding: DEFAULT_ENCODING.into(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: DEFAULT_ENCODING.into(),
            bpe,
        })
    }
}

impl Encoding for BpeEncoding {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }
}

impl fmt::Debug for BpeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeEncoding").field("name", &self.name).finish()
    }
}

/// Counts tokens for text and message lists under a single encoding.
///
/// Cheap to clone; clones share the encoding.
#[derive(Clone)]
pub struct TokenCounter {
    encoding: Arc<dyn Encoding>,
}

impl TokenCounter {
    pub fn new(encoding: Arc<dyn Encoding>) -> Self {
        Self { encoding }
    }

    /// Build a counter for `model` using the BPE tokenizer.
    pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
        Ok(Self::new(Arc::new(BpeEncoding::for_model(model)?)))
    }

    pub fn encoding_name(&self) -> &str {
        self.encoding.name()
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.encoding.count(text)
    }

    /// Cost of one message, without the list overhead.
    pub fn message_cost(&self, message: &Message) -> usize {
        MESSAGE_OVERHEAD
            + self.encoding.count(message.role.as_str())
            + self.encoding.count(&message.content)
    }

    /// Cost of a message list. An empty list costs [`CONVERSATION_OVERHEAD`].
    pub fn count_message_tokens(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.message_cost(m)).sum::<usize>() + CONVERSATION_OVERHEAD
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter")
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("Failed to load encoding {encoding}: {reason}")]
    Load { encoding: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::word_counter;

    fn bpe_counter() -> TokenCounter {
        TokenCounter::for_model("gpt-4").unwrap()
    }

    #[test]
    fn empty_list_costs_conversation_overhead() {
        assert_eq!(bpe_counter().count_message_tokens(&[]), CONVERSATION_OVERHEAD);
        assert_eq!(word_counter().count_message_tokens(&[]), 2);
    }

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(bpe_counter().count_tokens(""), 0);
    }

    #[test]
    fn single_short_message() {
        // 2 + (4 + "user" + "hello"), one token each under cl100k
        let counter = bpe_counter();
        assert_eq!(counter.count_message_tokens(&[Message::user("hello")]), 8);
    }

    #[test]
    fn word_encoding_costs_are_additive() {
        let counter = word_counter();
        let messages = vec![Message::system("be brief"), Message::user("one two three")];
        // 2 + (4 + 1 + 2) + (4 + 1 + 3)
        assert_eq!(counter.count_message_tokens(&messages), 17);
    }

    #[test]
    fn count_is_monotonic_when_content_grows() {
        let counter = bpe_counter();
        let mut content = String::from("The quick brown fox");
        let mut last = counter.count_message_tokens(&[Message::user(content.clone())]);
        for word in ["jumps", "over", "the", "lazy", "dog", "again", "!!!"] {
            content.push(' ');
            content.push_str(word);
            let now = counter.count_message_tokens(&[Message::user(content.clone())]);
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn unknown_model_falls_back_to_default_encoding() {
        let counter = TokenCounter::for_model("llama-3.3-70b-versatile").unwrap();
        assert_eq!(counter.encoding_name(), DEFAULT_ENCODING);
        assert!(counter.count_tokens("hello world") > 0);
    }

    #[test]
    fn known_model_keeps_its_name() {
        assert_eq!(bpe_counter().encoding_name(), "gpt-4");
    }
}
