//! Closed set of vendor replies and their normalisation into
//! [`ChatResponse`].

use std::time::Instant;

use uuid::Uuid;

use crate::domain::llm::{
    ChatChoice, ChatMessage, ChatResponse, FinishReason, MessageRole, ResponseMetadata,
    TokenUsage,
};
use crate::domain::ports::LlmProviderError;

use super::anthropic::AnthropicReply;
use super::gemini::GeminiReply;
use super::openai::OpenAiReply;

/// A decoded vendor reply, before normalisation.
#[derive(Debug)]
pub(super) enum VendorReply {
    OpenAi(OpenAiReply),
    Gemini(GeminiReply),
    Anthropic(AnthropicReply),
}

/// Milliseconds since `started`, saturating.
pub(super) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn or_requested(model: String, requested: &str) -> String {
    if model.trim().is_empty() {
        requested.to_owned()
    } else {
        model
    }
}

impl VendorReply {
    /// Convert into the unified response. A reply without any candidate is a
    /// decode failure.
    pub(super) fn into_response(
        self,
        provider: &'static str,
        requested_model: &str,
        attempts: u32,
        latency_ms: u64,
    ) -> Result<ChatResponse, LlmProviderError> {
        let (id, model, choices, usage) = match self {
            Self::OpenAi(reply) => {
                let choices = reply
                    .choices
                    .into_iter()
                    .map(|choice| ChatChoice {
                        index: choice.index,
                        message: ChatMessage {
                            role: choice.message.role,
                            content: choice.message.content.unwrap_or_default(),
                        },
                        finish_reason: FinishReason::normalise(choice.finish_reason.as_deref()),
                    })
                    .collect::<Vec<_>>();
                let usage = reply.usage.unwrap_or_default();
                (
                    reply.id,
                    reply.model,
                    choices,
                    TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
                )
            }
            Self::Gemini(reply) => {
                let choices = reply
                    .candidates
                    .into_iter()
                    .zip(0_u32..)
                    .map(|(candidate, position)| ChatChoice {
                        index: candidate.index.unwrap_or(position),
                        message: ChatMessage::assistant(candidate.text()),
                        finish_reason: FinishReason::normalise(candidate.finish_reason.as_deref()),
                    })
                    .collect::<Vec<_>>();
                let usage = reply.usage_metadata.unwrap_or_default();
                (
                    reply.response_id.unwrap_or_default(),
                    reply.model_version.unwrap_or_default(),
                    choices,
                    TokenUsage::new(usage.prompt_token_count, usage.candidates_token_count),
                )
            }
            Self::Anthropic(reply) => {
                let text = reply.text();
                let choices = vec![ChatChoice {
                    index: 0,
                    message: ChatMessage {
                        role: MessageRole::Assistant,
                        content: text,
                    },
                    finish_reason: FinishReason::normalise(reply.stop_reason.as_deref()),
                }];
                (
                    reply.id,
                    reply.model,
                    choices,
                    TokenUsage::new(reply.usage.input_tokens, reply.usage.output_tokens),
                )
            }
        };

        if choices.is_empty() {
            return Err(LlmProviderError::decode(format!(
                "{provider} reply carried no candidates"
            )));
        }
        let id = if id.is_empty() {
            format!("{provider}-{}", Uuid::new_v4())
        } else {
            id
        };
        Ok(ChatResponse {
            id,
            model: or_requested(model, requested_model),
            choices,
            usage,
            metadata: ResponseMetadata {
                provider: provider.to_owned(),
                attempts,
                latency_ms,
            },
        })
    }
}
