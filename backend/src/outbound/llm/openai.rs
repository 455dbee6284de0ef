//! OpenAI chat completions adapter.
//!
//! `POST {base}/chat/completions` with a bearer key. System messages are sent
//! natively. Retries wait `k` seconds before retry `k`.

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
pub const OPENAI: &str = "openai";
/// Default model.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// Public API root.
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
pub(super) struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
    stream: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAiReply {
    #[serde(default)]
    pub(super) id: String,
    #[serde(default)]
    pub(super) model: String,
    #[serde(default)]
    pub(super) choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub(super) usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAiChoice {
    #[serde(default)]
    pub(super) index: u32,
    pub(super) message: OpenAiMessage,
    #[serde(default)]
    pub(super) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAiMessage {
    pub(super) role: MessageRole,
    #[serde(default)]
    pub(super) content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct OpenAiUsage {
    #[serde(default)]
    pub(super) prompt_tokens: u32,
    #[serde(default)]
    pub(super) completion_tokens: u32,
}

/// OpenAI-compatible chat provider.
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl OpenAiProvider {
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

    fn body<'a>(&'a self, request: &'a ChatRequest) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: request.model.as_deref().unwrap_or(&self.config.model),
            messages: &request.messages,
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            stop: &request.stop,
            stream: false,
        }
    }

    fn endpoint(&self) -> Result<Url, LlmProviderError> {
        self.config.endpoint("chat/completions")
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(
        &self,
        request: &ChatRequest,
        cancellation: &CancellationToken,
    ) -> Result<ChatResponse, LlmProviderError> {
        let url = self.endpoint()?;
        let body = self.body(request);
        let started = Instant::now();
        let (reply, attempts) = run_with_retry(
            OPENAI,
            RetryPolicy::linear(self.config.retries),
            self.sleeper.as_ref(),
            cancellation,
            |attempt| {
                debug!(provider = OPENAI, attempt, model = body.model, "sending chat request");
                let call = self
                    .client
                    .post(url.clone())
                    .bearer_auth(self.config.api_key.as_str())
                    .json(&body);
                send_json::<OpenAiReply>(OPENAI, call, self.config.timeout_secs())
            },
        )
        .await?;
        VendorReply::OpenAi(reply).into_response(OPENAI, body.model, attempts, elapsed_ms(started))
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    fn name(&self) -> &'static str {
        OPENAI
    }

    fn validate_config(&self) -> Result<(), LlmProviderError> {
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    //! Wire-format checks plus a loopback server for retry behaviour.
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use actix_web::{App, HttpResponse, HttpServer, web};
    use rstest::rstest;
    use serde_json::json;

    use crate::domain::llm::FinishReason;

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn config(base: &str) -> ProviderConfig {
        ProviderConfig::new("sk-test", OPENAI_DEFAULT_MODEL, Url::parse(base).expect("url"))
            .with_retries(2)
    }

    fn provider(base: &str) -> OpenAiProvider {
        OpenAiProvider::with_sleeper(config(base), Arc::new(NoSleep)).expect("provider")
    }

    #[rstest]
    fn body_applies_defaults_and_overrides() {
        let provider = provider(OPENAI_DEFAULT_BASE_URL);
        let mut request = ChatRequest::new(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hi"),
        ]);
        request.model = Some("gpt-4o".to_owned());
        request.temperature = Some(0.2);
        let value = serde_json::to_value(provider.body(&request)).expect("serialise");
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["max_tokens"], 2000);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["stream"], false);
        assert!(value.get("stop").is_none());
        assert!((value["temperature"].as_f64().expect("temperature") - 0.2).abs() < 1e-6);
    }

    async fn flaky_completion(calls: web::Data<AtomicU32>) -> HttpResponse {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return HttpResponse::ServiceUnavailable().body("warming up");
        }
        HttpResponse::Ok().json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-3.5-turbo-0125",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "length"
            }],
            "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
        }))
    }

    async fn rejected_completion(calls: web::Data<AtomicU32>) -> HttpResponse {
        calls.fetch_add(1, Ordering::SeqCst);
        HttpResponse::Unauthorized().body("bad key")
    }

    async fn serve<F, Fut>(handler: F) -> (String, web::Data<AtomicU32>)
    where
        F: Fn(web::Data<AtomicU32>) -> Fut + Clone + Send + 'static,
        Fut: std::future::Future<Output = HttpResponse> + 'static,
    {
        let calls = web::Data::new(AtomicU32::new(0));
        let shared = calls.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(shared.clone())
                .route("/v1/chat/completions", web::post().to(handler.clone()))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind loopback");
        let addr = server.addrs()[0];
        actix_rt::spawn(server.run());
        (format!("http://{addr}/v1"), calls)
    }

    #[actix_rt::test]
    async fn transient_failures_are_retried() {
        let (base, calls) = serve(flaky_completion).await;
        let response = provider(&base)
            .chat(
                &ChatRequest::new(vec![ChatMessage::user("hi")]),
                &CancellationToken::new(),
            )
            .await
            .expect("second attempt succeeds");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(response.text(), Some("hello"));
        assert_eq!(response.choices[0].finish_reason, FinishReason::Length);
        assert_eq!(response.usage.total_tokens, 10);
        assert_eq!(response.metadata.attempts, 2);
        assert_eq!(response.metadata.provider, OPENAI);
    }

    #[actix_rt::test]
    async fn client_errors_fail_immediately() {
        let (base, calls) = serve(rejected_completion).await;
        let error = provider(&base)
            .chat(
                &ChatRequest::new(vec![ChatMessage::user("hi")]),
                &CancellationToken::new(),
            )
            .await
            .expect_err("401 is permanent");

        assert!(matches!(error, LlmProviderError::Status { status: 401, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
