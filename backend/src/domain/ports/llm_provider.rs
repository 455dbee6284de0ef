//! Port for language model vendors.
//!
//! Each adapter owns its endpoint, key, model, timeout, retry policy, and
//! wire format. Callers only ever see the unified chat types.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::llm::{ChatRequest, ChatResponse, estimate_tokens};

use super::define_port_error;

define_port_error! {
    /// Errors raised by language model providers.
    pub enum LlmProviderError {
        /// The request never produced an HTTP response.
        Transport { message: String } => "provider transport failed: {message}",
        /// The overall request timeout elapsed.
        Timeout { seconds: u64 } => "provider request timed out after {seconds}s",
        /// The vendor answered with a non-success status.
        Status { status: u16, body: String } => "provider returned HTTP {status}: {body}",
        /// The vendor's reply did not match its documented shape.
        Decode { message: String } => "provider reply could not be decoded: {message}",
        /// The provider configuration is unusable.
        Config { message: String } => "provider configuration invalid: {message}",
        /// No provider is registered under the requested name.
        UnknownProvider { name: String } => "provider `{name}` is not configured",
        /// The caller went away.
        Cancelled => "provider request cancelled",
    }
}

impl LlmProviderError {
    /// Transport failures, timeouts, and 5xx responses are worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode { .. }
            | Self::Config { .. }
            | Self::UnknownProvider { .. }
            | Self::Cancelled => false,
        }
    }
}

/// A configured language model backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one chat request, retrying transient failures per the provider's
    /// policy. Cancelling `cancellation` aborts the in-flight attempt or the
    /// backoff sleep and returns [`LlmProviderError::Cancelled`].
    async fn chat(
        &self,
        request: &ChatRequest,
        cancellation: &CancellationToken,
    ) -> Result<ChatResponse, LlmProviderError>;

    /// Model id used when the request does not override it.
    fn model(&self) -> String;

    /// Registry name, such as `openai`.
    fn name(&self) -> &'static str;

    /// Reject unusable configuration before the provider is registered.
    fn validate_config(&self) -> Result<(), LlmProviderError>;

    /// Approximate token count of `text`.
    fn estimate_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}
