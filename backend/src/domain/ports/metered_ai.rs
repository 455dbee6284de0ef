//! Driving port for metered AI operations.
//!
//! Every operation debits exactly one credit when, and only when, it
//! succeeds. Inbound adapters pass a [`CallContext`] whose cancellation
//! token fires when the client goes away.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::domain::llm::{ChatMessage, TokenUsage};
use crate::domain::{AiShoppingListRequest, Error, Recipe, RecipeRequest, ShoppingList, UserId};

/// Caller identity and cancellation for one metered call.
#[derive(Debug, Clone)]
pub struct CallContext {
    user_id: UserId,
    cancellation: CancellationToken,
}

impl CallContext {
    /// Context for `user_id` observing `cancellation`.
    #[must_use]
    pub fn new(user_id: UserId, cancellation: CancellationToken) -> Self {
        Self {
            user_id,
            cancellation,
        }
    }

    /// Context that is never cancelled.
    #[must_use]
    pub fn detached(user_id: UserId) -> Self {
        Self::new(user_id, CancellationToken::new())
    }

    /// Calling user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Token cancelled when the caller disconnects.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Free-form chat request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatCommand {
    /// Conversation so far; must not be empty.
    pub messages: Vec<ChatMessage>,
    /// Provider override.
    #[serde(default)]
    pub provider: Option<String>,
    /// Completion token ceiling.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature in `[0, 2]`.
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Chat result returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    /// Assistant turn.
    pub message: ChatMessage,
    /// Provider that answered.
    pub provider: String,
    /// Model that answered.
    pub model: String,
    /// Token accounting.
    pub usage: TokenUsage,
}

/// Metered use-cases of the AI pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeteredAi: Send + Sync {
    /// Generate and persist one recipe.
    async fn generate_recipe(
        &self,
        context: &CallContext,
        request: &RecipeRequest,
    ) -> Result<Recipe, Error>;

    /// Generate `count` recipes with sequential dispatches. Parsing is
    /// all-or-nothing, persistence is atomic, and one credit is debited.
    async fn generate_recipes(
        &self,
        context: &CallContext,
        request: &RecipeRequest,
        count: usize,
    ) -> Result<Vec<Recipe>, Error>;

    /// Generate and persist a shopping list.
    async fn generate_shopping_list(
        &self,
        context: &CallContext,
        request: &AiShoppingListRequest,
    ) -> Result<ShoppingList, Error>;

    /// Forward a conversation to the model.
    async fn chat(&self, context: &CallContext, command: &ChatCommand) -> Result<ChatReply, Error>;
}
