//! Google Gemini `generateContent` adapter.
//!
//! Gemini has no system role: system text is folded into the first user
//! turn. The key travels as a `key` query parameter. Retries wait a fixed
//! second.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::llm::{
    ChatMessage, ChatRequest, ChatResponse, MessageRole, RetryPolicy, Sleeper, TokioSleeper,
    run_with_retry,
};
use crate::domain::ports::{LlmProvider, LlmProviderError};

use super::config::ProviderConfig;
use super::http::{build_client, send_json};
use super::reply::{VendorReply, elapsed_ms};

/// Registry name.
pub const GEMINI: &str = "gemini";
/// Default model.
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";
/// Public API root.
pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiRequest {
    contents: Vec<GeminiTurn>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiTurn {
    role: &'static str,
    parts: Vec<GeminiPartOut>,
}

#[derive(Debug, Serialize)]
struct GeminiPartOut {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiReply {
    #[serde(default)]
    pub(super) candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub(super) usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    pub(super) model_version: Option<String>,
    #[serde(default)]
    pub(super) response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    pub(super) finish_reason: Option<String>,
    #[serde(default)]
    pub(super) index: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiUsage {
    #[serde(default)]
    pub(super) prompt_token_count: u32,
    #[serde(default)]
    pub(super) candidates_token_count: u32,
}

impl GeminiCandidate {
    /// Text parts joined in order.
    pub(super) fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Fold system messages into the first user turn and map roles.
fn fold_turns(messages: &[ChatMessage]) -> Vec<GeminiTurn> {
    let system = messages
        .iter()
        .filter(|message| message.role == MessageRole::System)
        .map(|message| message.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let mut pending_system = (!system.is_empty()).then_some(system);

    let mut turns = Vec::with_capacity(messages.len());
    for message in messages {
        let role = match message.role {
            MessageRole::System => continue,
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        };
        let text = match (role, pending_system.take()) {
            ("user", Some(system)) => format!("{system}\n\n{}", message.content),
            (_, carried) => {
                pending_system = carried;
                message.content.clone()
            }
        };
        turns.push(GeminiTurn {
            role,
            parts: vec![GeminiPartOut { text }],
        });
    }
    if let Some(system) = pending_system {
        turns.insert(
            0,
            GeminiTurn {
                role: "user",
                parts: vec![GeminiPartOut { text: system }],
            },
        );
    }
    turns
}

/// Gemini chat provider.
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl GeminiProvider {
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

    fn body(&self, request: &ChatRequest) -> GeminiRequest {
        GeminiRequest {
            contents: fold_turns(&request.messages),
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(self.config.temperature),
                max_output_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
                top_p: request.top_p,
                stop_sequences: request.stop.clone(),
            },
        }
    }

    fn endpoint(&self, model: &str) -> Result<Url, LlmProviderError> {
        self.config
            .endpoint(&format!("models/{model}:generateContent"))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(
        &self,
        request: &ChatRequest,
        cancellation: &CancellationToken,
    ) -> Result<ChatResponse, LlmProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let url = self.endpoint(model)?;
        let body = self.body(request);
        let started = Instant::now();
        let (reply, attempts) = run_with_retry(
            GEMINI,
            RetryPolicy::fixed(self.config.retries),
            self.sleeper.as_ref(),
            cancellation,
            |attempt| {
                debug!(provider = GEMINI, attempt, model, "sending chat request");
                let call = self
                    .client
                    .post(url.clone())
                    .query(&[("key", self.config.api_key.as_str())])
                    .json(&body);
                send_json::<GeminiReply>(GEMINI, call, self.config.timeout_secs())
            },
        )
        .await?;
        VendorReply::Gemini(reply).into_response(GEMINI, model, attempts, elapsed_ms(started))
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    fn name(&self) -> &'static str {
        GEMINI
    }

    fn validate_config(&self) -> Result<(), LlmProviderError> {
        self.config.validate()
    }
}
