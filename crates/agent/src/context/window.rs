//! Context Manager: fits conversation history to the model's limits.
//!
//! Two reductions run in a fixed order:
//!
//! 1. **Sliding window by count.** Over `max_history_messages`, all system
//!    messages are kept and only the most recent non-system messages fill
//!    the rest of the cap.
//! 2. **Token budget.** Over `max_tokens`, system messages are kept and the
//!    non-system messages are walked newest to oldest, stopping at the first
//!    one that does not fit. Older turns are never packed in around a
//!    message that was too large.
//!
//! The output lists system messages first, then the surviving turns in
//! their original order.

use parley_core::message::Message;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::token::TokenCounter;

/// What happened while fitting a message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextReport {
    pub input_messages: usize,
    /// Message count after the sliding window.
    pub after_window: usize,
    pub output_messages: usize,
    /// Tokens after the sliding window, before budget truncation.
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub budget: usize,
    /// Whether budget truncation ran.
    pub truncated: bool,
    /// System messages alone exceeded the budget; only the first was kept.
    pub degraded: bool,
}

/// A fitted message list with its report.
#[derive(Debug, Clone)]
pub struct ManagedContext {
    pub messages: Vec<Message>,
    pub report: ContextReport,
}

/// Applies the sliding window and token budget before every model call.
#[derive(Debug, Clone)]
pub struct ContextManager {
    max_history_messages: usize,
    max_tokens: usize,
    counter: TokenCounter,
}

impl ContextManager {
    pub fn new(max_history_messages: usize, max_tokens: usize, counter: TokenCounter) -> Self {
        Self {
            max_history_messages,
            max_tokens,
            counter,
        }
    }

    /// Same manager with different limits (used by the context preview).
    pub fn with_limits(&self, max_history_messages: usize, max_tokens: usize) -> Self {
        Self::new(max_history_messages, max_tokens, self.counter.clone())
    }

    pub fn max_history_messages(&self) -> usize {
        self.max_history_messages
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    /// Fit `history` to the configured limits.
    pub fn build_context(&self, history: &[Message]) -> ManagedContext {
        let windowed = self.apply_window(history);
        let after_window = windowed.len();
        let tokens_before = self.counter.count_message_tokens(&windowed);

        let (messages, truncated, degraded) = if tokens_before > self.max_tokens {
            warn!(
                tokens = tokens_before,
                budget = self.max_tokens,
                "Message tokens exceed budget, truncating"
            );
            let (messages, degraded) = self.truncate(windowed);
            (messages, true, degraded)
        } else {
            (windowed, false, false)
        };

        let tokens_after = if truncated {
            let after = self.counter.count_message_tokens(&messages);
            info!(tokens = after, messages = messages.len(), "Messages truncated");
            after
        } else {
            tokens_before
        };

        let report = ContextReport {
            input_messages: history.len(),
            after_window,
            output_messages: messages.len(),
            tokens_before,
            tokens_after,
            budget: self.max_tokens,
            truncated,
            degraded,
        };

        ManagedContext { messages, report }
    }

    /// Phase 1: cap the message count, keeping every system message.
    fn apply_window(&self, history: &[Message]) -> Vec<Message> {
        if history.len() <= self.max_history_messages {
            return history.to_vec();
        }

        let (system, rest): (Vec<&Message>, Vec<&Message>) =
            history.iter().partition(|m| m.is_system());

        // System messages may exceed the cap on their own; then no turns survive.
        let keep = self.max_history_messages.saturating_sub(system.len());
        let skip = rest.len().saturating_sub(keep);

        system
            .into_iter()
            .chain(rest.into_iter().skip(skip))
            .cloned()
            .collect()
    }

    /// Phase 2: drop the oldest turns until the list fits the token budget.
    fn truncate(&self, messages: Vec<Message>) -> (Vec<Message>, bool) {
        let (system, rest): (Vec<Message>, Vec<Message>) =
            messages.into_iter().partition(|m| m.is_system());

        let system_tokens = self.counter.count_message_tokens(&system);
        if system_tokens >= self.max_tokens {
            warn!(
                system_tokens,
                budget = self.max_tokens,
                "System messages exceed token budget, keeping only the first"
            );
            return (system.into_iter().take(1).collect(), true);
        }
        let remaining = self.max_tokens - system_tokens;

        let mut used = 0;
        let mut kept = 0;
        for message in rest.iter().rev() {
            // Each turn is costed as its own list, overhead included.
            let cost = self.counter.count_message_tokens(std::slice::from_ref(message));
            if used + cost > remaining {
                break;
            }
            used += cost;
            kept += 1;
        }

        let skip = rest.len() - kept;
        let mut result = system;
        result.extend(rest.into_iter().skip(skip));
        (result, false)
    }
}
