//! Anthropic Messages API adapter.
//!
//! `POST {base}/messages` with `x-api-key`. System text moves to the
//! top-level `system` field. Retries wait `k` seconds before retry `k`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::llm::{
    ChatRequest, ChatResponse, MessageRole, RetryPolicy, Sleeper, TokioSleeper, run_with_retry,
};
use crate::domain::ports::{LlmProvider, LlmProviderError};

use super::config::ProviderConfig;
use super::http::{build_client, send_json};
use super::reply::{VendorReply, elapsed_ms};

/// Registry name.
pub const ANTHROPIC: &str = "anthropic";
/// Default model.
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
/// Public API root.
pub const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
pub(super) struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicTurn<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Serialize)]
struct AnthropicTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnthropicReply {
    #[serde(default)]
    pub(super) id: String,
    #[serde(default)]
    pub(super) model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    pub(super) stop_reason: Option<String>,
    #[serde(default)]
    pub(super) usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AnthropicUsage {
    #[serde(default)]
    pub(super) input_tokens: u32,
    #[serde(default)]
    pub(super) output_tokens: u32,
}

impl AnthropicReply {
    /// Text blocks concatenated in order; other block kinds are skipped.
    pub(super) fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect()
    }
}

/// Anthropic chat provider.
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl AnthropicProvider {
    /// Provider that sleeps on the tokio timer between retries.
    pub fn new(config: ProviderConfig) -> Result<Self, LlmProviderError> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Provider with an injected backoff sleeper.
    pub fn with_sleeper(
        config: ProviderConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, LlmProviderError> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            client,
            config,
            sleeper,
        })
    }

    fn body<'a>(&'a self, request: &'a ChatRequest) -> AnthropicRequest<'a> {
        let system = request
            .messages
            .iter()
            .filter(|message| message.role == MessageRole::System)
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let messages = request
            .messages
            .iter()
            .filter_map(|message| {
                let role = match message.role {
                    MessageRole::System => return None,
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                };
                Some(AnthropicTurn {
                    role,
                    content: &message.content,
                })
            })
            .collect();
        AnthropicRequest {
            model: request.model.as_deref().unwrap_or(&self.config.model),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            system: (!system.is_empty()).then_some(system),
            messages,
            temperature: request.temperature.unwrap_or(self.config.temperature),
            top_p: request.top_p,
            stop_sequences: &request.stop,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(
        &self,
        request: &ChatRequest,
        cancellation: &CancellationToken,
    ) -> Result<ChatResponse, LlmProviderError> {
        let url = self.config.endpoint("messages")?;
        let body = self.body(request);
        let started = Instant::now();
        let (reply, attempts) = run_with_retry(
            ANTHROPIC,
            RetryPolicy::linear(self.config.retries),
            self.sleeper.as_ref(),
            cancellation,
            |attempt| {
                debug!(provider = ANTHROPIC, attempt, model = body.model, "sending chat request");
                let call = self
                    .client
                    .post(url.clone())
                    .header("x-api-key", self.config.api_key.as_str())
                    .header("anthropic-version", API_VERSION)
                    .json(&body);
                send_json::<AnthropicReply>(ANTHROPIC, call, self.config.timeout_secs())
            },
        )
        .await?;
        VendorReply::Anthropic(reply).into_response(
            ANTHROPIC,
            body.model,
            attempts,
            elapsed_ms(started),
        )
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    fn name(&self) -> &'static str {
        ANTHROPIC
    }

    fn validate_config(&self) -> Result<(), LlmProviderError> {
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ChatMessage;
    use reqwest::Url;
    use rstest::rstest;

    #[rstest]
    fn system_text_moves_to_top_level_field() {
        let config = ProviderConfig::new(
            "a-key",
            ANTHROPIC_DEFAULT_MODEL,
            Url::parse(ANTHROPIC_DEFAULT_BASE_URL).expect("url"),
        );
        let provider = AnthropicProvider::new(config).expect("provider");
        let request = ChatRequest::new(vec![
            ChatMessage::system("Reply in JSON."),
            ChatMessage::user("List fruit."),
        ]);
        let value = serde_json::to_value(provider.body(&request)).expect("serialise");

        assert_eq!(value["system"], "Reply in JSON.");
        assert_eq!(value["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["model"], ANTHROPIC_DEFAULT_MODEL);
        assert!(value.get("stop_sequences").is_none());
    }

    #[rstest]
    fn unknown_block_kinds_are_skipped() {
        let reply: AnthropicReply = serde_json::from_value(serde_json::json!({
            "content": [{"type": "thinking", "thinking": "..."}, {"type": "text", "text": "ok"}]
        }))
        .expect("decode");
        assert_eq!(reply.text(), "ok");
    }
}
