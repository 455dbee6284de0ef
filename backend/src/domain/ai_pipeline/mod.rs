//! Metered AI pipeline implementing [`MeteredAi`].
//!
//! Each entry point runs the same sequence: validate, authorise the pantry,
//! read its ingredients, render prompts, dispatch through the provider
//! registry, parse and repair the reply, enrich and persist the artifact,
//! then debit one credit. The debit is last, so nothing before it is ever
//! charged. A debit that fails after persistence keeps the artifact and
//! surfaces the ledger's error; operators reconcile with a manual grant.
//!
//! Retries belong to providers. The pipeline never re-dispatches a request
//! end to end.

mod chat;
mod recipes;
mod shopping;

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::llm::{ChatRequest, ChatResponse, ProviderRegistry};
use crate::domain::ports::{
    CallContext, ChatCommand, ChatReply, CreditLedger, LlmProvider, LlmProviderError, MeteredAi,
    PantryAccess, RecipeRepository, ShoppingListRepository,
};
use crate::domain::prompt::PromptTemplates;
use crate::domain::{
    AiShoppingListRequest, Error, Ingredient, PantryId, Recipe, RecipeRequest, ShoppingList,
};

/// Recipes produced by one `POST /recipes/generate`.
pub const DEFAULT_RECIPE_COUNT: usize = 3;
/// Upper bound on recipes per metered call.
pub const MAX_RECIPE_COUNT: usize = 5;

const RECIPE_DEBIT_LABEL: &str = "Recipe generation";
const SHOPPING_DEBIT_LABEL: &str = "AI shopping list generation";
const CHAT_DEBIT_LABEL: &str = "LLM chat";

/// Port bundle required by the pipeline.
pub struct AiPipelinePorts {
    /// Credit ledger used for the final debit.
    pub ledger: Arc<dyn CreditLedger>,
    /// Pantry authorisation and ingredient reader.
    pub pantries: Arc<dyn PantryAccess>,
    /// Recipe persistence.
    pub recipes: Arc<dyn RecipeRepository>,
    /// Shopping list persistence.
    pub shopping_lists: Arc<dyn ShoppingListRepository>,
    /// Prompt template source.
    pub templates: Arc<dyn PromptTemplates>,
    /// Configured language model providers.
    pub providers: Arc<ProviderRegistry>,
}

impl AiPipelinePorts {
    /// Build a strongly-typed pipeline port bundle.
    pub fn new(
        ledger: Arc<dyn CreditLedger>,
        pantries: Arc<dyn PantryAccess>,
        recipes: Arc<dyn RecipeRepository>,
        shopping_lists: Arc<dyn ShoppingListRepository>,
        templates: Arc<dyn PromptTemplates>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            ledger,
            pantries,
            recipes,
            shopping_lists,
            templates,
            providers,
        }
    }
}

/// Orchestrates metered model calls.
pub struct AiPipeline {
    ledger: Arc<dyn CreditLedger>,
    pantries: Arc<dyn PantryAccess>,
    recipes: Arc<dyn RecipeRepository>,
    shopping_lists: Arc<dyn ShoppingListRepository>,
    templates: Arc<dyn PromptTemplates>,
    providers: Arc<ProviderRegistry>,
    clock: Arc<dyn Clock>,
}

impl AiPipeline {
    /// Build the pipeline from its ports.
    pub fn new(ports: AiPipelinePorts, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: ports.ledger,
            pantries: ports.pantries,
            recipes: ports.recipes,
            shopping_lists: ports.shopping_lists,
            templates: ports.templates,
            providers: ports.providers,
            clock,
        }
    }

    async fn pantry_ingredients(
        &self,
        context: &CallContext,
        pantry_id: &PantryId,
    ) -> Result<Vec<Ingredient>, Error> {
        let ingredients = self
            .pantries
            .list_ingredients(&context.user_id(), pantry_id)
            .await?;
        Ok(ingredients.into_iter().map(Ingredient::normalised).collect())
    }

    fn provider(&self, requested: Option<&str>) -> Result<Arc<dyn LlmProvider>, Error> {
        self.providers.resolve(requested)
    }

    /// Send one request and return the reply text.
    async fn dispatch(
        &self,
        context: &CallContext,
        provider: &dyn LlmProvider,
        request: &ChatRequest,
    ) -> Result<(String, ChatResponse), Error> {
        let response = provider
            .chat(request, context.cancellation())
            .await
            .map_err(|error| map_provider_error(provider.name(), error))?;
        let text = response
            .text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::invalid_llm_response("model returned no content")
                    .with_details(json!({ "provider": provider.name() }))
            })?;
        debug!(
            provider = provider.name(),
            model = %response.model,
            attempts = response.metadata.attempts,
            total_tokens = response.usage.total_tokens,
            "model replied"
        );
        Ok((text, response))
    }

    /// Debit one credit once the artifact is safe.
    async fn settle(&self, context: &CallContext, label: &str) -> Result<(), Error> {
        let user_id = context.user_id();
        match self.ledger.consume_credit(&user_id, label).await {
            Ok(wallet) => {
                info!(
                    user_id = %user_id,
                    balance = wallet.balance,
                    operation = label,
                    "metered call settled"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    user_id = %user_id,
                    operation = label,
                    code = ?error.code(),
                    %error,
                    "debit failed after the model call succeeded; artifact kept"
                );
                Err(error)
            }
        }
    }
}

fn map_provider_error(provider: &str, error: LlmProviderError) -> Error {
    debug!(provider, kind = error.kind(), %error, "provider call failed");
    let details = json!({ "provider": provider, "kind": error.kind() });
    match error {
        LlmProviderError::UnknownProvider { name } => {
            Error::invalid_request(format!("provider `{name}` is not configured"))
                .with_details(details)
        }
        LlmProviderError::Cancelled => {
            Error::llm_request_failed("request cancelled").with_details(details)
        }
        other => Error::llm_request_failed(format!("{provider} request failed: {other}"))
            .with_details(details),
    }
}

#[async_trait]
impl MeteredAi for AiPipeline {
    async fn generate_recipe(
        &self,
        context: &CallContext,
        request: &RecipeRequest,
    ) -> Result<Recipe, Error> {
        self.generate_recipes(context, request, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::internal("recipe batch was empty"))
    }

    async fn generate_recipes(
        &self,
        context: &CallContext,
        request: &RecipeRequest,
        count: usize,
    ) -> Result<Vec<Recipe>, Error> {
        self.run_recipe_batch(context, request, count).await
    }

    async fn generate_shopping_list(
        &self,
        context: &CallContext,
        request: &AiShoppingListRequest,
    ) -> Result<ShoppingList, Error> {
        self.run_shopping_list(context, request).await
    }

    async fn chat(&self, context: &CallContext, command: &ChatCommand) -> Result<ChatReply, Error> {
        self.run_chat(context, command).await
    }
}
