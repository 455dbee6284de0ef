//! Free-form metered chat.

use serde_json::json;

use super::{AiPipeline, CHAT_DEBIT_LABEL};
use crate::domain::Error;
use crate::domain::llm::{ChatMessage, ChatRequest, MessageRole};
use crate::domain::ports::{CallContext, ChatCommand, ChatReply};

fn validate(command: &ChatCommand) -> Result<(), Error> {
    if command.messages.is_empty() {
        return Err(Error::invalid_request("at least one message is required")
            .with_details(json!({ "field": "messages" })));
    }
    if let Some(index) = command
        .messages
        .iter()
        .position(|message| message.content.trim().is_empty())
    {
        return Err(Error::invalid_request("message content must not be empty")
            .with_details(json!({ "field": "messages", "index": index })));
    }
    if !command
        .messages
        .iter()
        .any(|message| message.role == MessageRole::User)
    {
        return Err(Error::invalid_request("conversation needs a user message")
            .with_details(json!({ "field": "messages" })));
    }
    if command
        .temperature
        .is_some_and(|temperature| !(0.0..=2.0).contains(&temperature))
    {
        return Err(Error::invalid_request("temperature must be between 0 and 2")
            .with_details(json!({ "field": "temperature" })));
    }
    if command.max_tokens == Some(0) {
        return Err(Error::invalid_request("max_tokens must be positive")
            .with_details(json!({ "field": "max_tokens" })));
    }
    Ok(())
}

impl AiPipeline {
    pub(super) async fn run_chat(
        &self,
        context: &CallContext,
        command: &ChatCommand,
    ) -> Result<ChatReply, Error> {
        validate(command)?;
        let provider = self.provider(command.provider.as_deref())?;
        let request = ChatRequest {
            max_tokens: command.max_tokens,
            temperature: command.temperature,
            ..ChatRequest::new(command.messages.clone())
        };
        let (text, response) = self.dispatch(context, provider.as_ref(), &request).await?;
        self.settle(context, CHAT_DEBIT_LABEL).await?;
        let provider_name = if response.metadata.provider.is_empty() {
            provider.name().to_owned()
        } else {
            response.metadata.provider
        };
        Ok(ChatReply {
            message: ChatMessage::assistant(text),
            provider: provider_name,
            model: response.model,
            usage: response.usage,
        })
    }
}
