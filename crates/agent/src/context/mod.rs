//! Context fitting: token accounting and the history window.
//!
//! | Step | Module | Rule |
//! |------|--------|------|
//! | Count | [`token`] | fixed encoding, +4 per message, +2 per list |
//! | Window | [`window`] | keep system messages, drop oldest turns over the cap |
//! | Budget | [`window`] | keep system messages, keep newest turns that fit |

pub mod token;
pub mod window;

pub use token::{
    BpeEncoding, CONVERSATION_OVERHEAD, DEFAULT_ENCODING, Encoding, MESSAGE_OVERHEAD,
    TokenCounter, TokenizerError,
};
pub use window::{ContextManager, ContextReport, ManagedContext};
