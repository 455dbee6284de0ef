//! Deterministic language model provider for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::llm::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, FinishReason, ResponseMetadata,
    TokenUsage, estimate_tokens,
};
use crate::domain::ports::{LlmProvider, LlmProviderError};

/// Provider answering from a queue of canned replies.
///
/// Queued entries are consumed in order; once the queue is empty the
/// default reply, if any, answers every call.
pub struct ScriptedLlmProvider {
    name: &'static str,
    model: String,
    queue: Mutex<VecDeque<Result<String, LlmProviderError>>>,
    default_reply: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl ScriptedLlmProvider {
    /// Provider registered as `name` reporting `model`.
    pub fn new(name: &'static str, model: impl Into<String>) -> Self {
        Self {
            name,
            model: model.into(),
            queue: Mutex::new(VecDeque::new()),
            default_reply: None,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer with `text` whenever the queue is empty.
    #[must_use]
    pub fn with_default_reply(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    /// Queue one successful reply.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.lock_queue().push_back(Ok(text.into()));
    }

    /// Queue one failure.
    pub fn push_failure(&self, error: LlmProviderError) {
        self.lock_queue().push_back(Err(error));
    }

    /// Calls received so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmProviderError>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_reply(&self) -> Result<String, LlmProviderError> {
        match self.lock_queue().pop_front() {
            Some(scripted) => scripted,
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| LlmProviderError::transport("scripted replies exhausted")),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn chat(
        &self,
        request: &ChatRequest,
        cancellation: &CancellationToken,
    ) -> Result<ChatResponse, LlmProviderError> {
        if cancellation.is_cancelled() {
            return Err(LlmProviderError::cancelled());
        }
        let number = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let text = self.next_reply()?;
        let prompt_tokens = u32::try_from(estimate_tokens(&request.prompt_text())).unwrap_or(u32::MAX);
        let completion_tokens = u32::try_from(estimate_tokens(&text)).unwrap_or(u32::MAX);
        Ok(ChatResponse {
            id: format!("{}-{number}", self.name),
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: FinishReason::Stop,
            }],
            usage: TokenUsage::new(prompt_tokens, completion_tokens),
            metadata: ResponseMetadata {
                provider: self.name.to_owned(),
                attempts: 1,
                latency_ms: 0,
            },
        })
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn validate_config(&self) -> Result<(), LlmProviderError> {
        if self.model.trim().is_empty() {
            return Err(LlmProviderError::config("model must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("hello there")])
    }

    #[rstest]
    #[tokio::test]
    async fn queued_replies_precede_the_default() {
        let provider = ScriptedLlmProvider::new("scripted", "script-1").with_default_reply("fallback");
        provider.push_reply("first");
        provider.push_failure(LlmProviderError::status(503_u16, "busy"));
        let token = CancellationToken::new();

        let first = provider.chat(&request(), &token).await.expect("first");
        let second = provider.chat(&request(), &token).await;
        let third = provider.chat(&request(), &token).await.expect("default");

        assert_eq!(first.text(), Some("first"));
        assert!(matches!(second, Err(LlmProviderError::Status { status: 503, .. })));
        assert_eq!(third.text(), Some("fallback"));
        assert_eq!(provider.calls(), 3);
        assert_eq!(first.usage.prompt_tokens, 3);
    }

    #[rstest]
    #[tokio::test]
    async fn cancelled_calls_are_not_counted() {
        let provider = ScriptedLlmProvider::new("scripted", "script-1").with_default_reply("x");
        let token = CancellationToken::new();
        token.cancel();
        let result = provider.chat(&request(), &token).await;
        assert_eq!(result, Err(LlmProviderError::Cancelled));
        assert_eq!(provider.calls(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn exhausted_script_is_a_transport_failure() {
        let provider = ScriptedLlmProvider::new("scripted", "script-1");
        let result = provider.chat(&request(), &CancellationToken::new()).await;
        assert!(matches!(result, Err(LlmProviderError::Transport { .. })));
    }
}
