//! Vendor-neutral chat types shared by every language model provider.
//!
//! Providers translate [`ChatRequest`] into their own wire shape and decode
//! their reply back into [`ChatResponse`]; the AI pipeline never sees vendor
//! payloads.

mod registry;
mod retry;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use registry::ProviderRegistry;
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper, run_with_retry};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions framing the conversation.
    System,
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// Author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
}

impl ChatMessage {
    /// System turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// User turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Unified chat request.
///
/// Unset sampling fields fall back to the provider's configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Completion token ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature in `[0, 2]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Repetition penalty by frequency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Repetition penalty by presence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Model override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Streaming is not supported; providers always send `false`.
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Request carrying only `messages`.
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Concatenated text of every message, used for token estimates.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end or stop sequence.
    #[default]
    Stop,
    /// Token ceiling reached.
    Length,
    /// Vendor safety filter intervened.
    ContentFilter,
}

impl FinishReason {
    /// Map a vendor finish reason onto the unified set; unknown values are
    /// treated as `stop`.
    ///
    /// # Examples
    /// ```
    /// use pantry_backend::domain::llm::FinishReason;
    ///
    /// assert_eq!(FinishReason::normalise(Some("MAX_TOKENS")), FinishReason::Length);
    /// assert_eq!(FinishReason::normalise(Some("end_turn")), FinishReason::Stop);
    /// ```
    #[must_use]
    pub fn normalise(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("length" | "max_tokens") => Self::Length,
            Some("content_filter" | "safety" | "recitation" | "blocklist" | "prohibited_content") => {
                Self::ContentFilter
            }
            _ => Self::Stop,
        }
    }
}

/// One candidate completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatChoice {
    /// Position among the candidates.
    pub index: u32,
    /// Generated message.
    pub message: ChatMessage,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
}

/// Token accounting reported by the vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Usage with a computed total.
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Call metadata attached by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    /// Provider name, such as `openai`.
    pub provider: String,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Wall time across all attempts, in milliseconds.
    pub latency_ms: u64,
}

/// Unified chat response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Vendor response id.
    pub id: String,
    /// Model that produced the reply.
    pub model: String,
    /// Candidates, at least one on success.
    pub choices: Vec<ChatChoice>,
    /// Token accounting.
    pub usage: TokenUsage,
    /// Provider metadata.
    pub metadata: ResponseMetadata,
}

impl ChatResponse {
    /// Text of the first candidate, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
    }
}

/// Rough token estimate of about four characters per token, rounded up.
///
/// # Examples
/// ```
/// use pantry_backend::domain::llm::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
