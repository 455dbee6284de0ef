//! Reqwest-backed language model providers.
//!
//! Each adapter implements [`crate::domain::ports::LlmProvider`] for one
//! vendor. Transport details (timeouts, status mapping, decoding) live in
//! `http`; vendor replies are normalised in `reply`.

mod anthropic;
mod config;
mod gemini;
mod http;
mod openai;
mod reply;

pub use anthropic::{
    ANTHROPIC, ANTHROPIC_DEFAULT_BASE_URL, ANTHROPIC_DEFAULT_MODEL, AnthropicProvider,
};
pub use config::{
    DEFAULT_MAX_TOKENS, DEFAULT_RETRIES, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT, ProviderConfig,
};
pub use gemini::{GEMINI, GEMINI_DEFAULT_BASE_URL, GEMINI_DEFAULT_MODEL, GeminiProvider};
pub use openai::{OPENAI, OPENAI_DEFAULT_BASE_URL, OPENAI_DEFAULT_MODEL, OpenAiProvider};
