//! LLM provider implementations for parley.
//!
//! All providers implement the `parley_core::Provider` trait.
//! [`build_from_config`] selects the backend named in configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
