//! Builders for HTTP state: repositories, services, and providers.
//!
//! A configured database selects the Diesel adapters; otherwise the
//! in-memory adapters back every port. Either way the same domain services
//! sit in front of them.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::info;

use pantry_backend::domain::llm::ProviderRegistry;
use pantry_backend::domain::ports::{
    CreditRepository, LlmProvider, LlmProviderError, PantryRepository, RecipeRepository,
    ShoppingListRepository,
};
use pantry_backend::domain::prompt::StaticPromptTemplates;
use pantry_backend::domain::{
    AiPipeline, AiPipelinePorts, CreditService, PantryService, RecipeService,
};
use pantry_backend::inbound::http::auth::JwtAuthenticator;
use pantry_backend::inbound::http::state::{HttpState, HttpStatePorts};
use pantry_backend::outbound::llm::{
    ANTHROPIC, AnthropicProvider, GEMINI, GeminiProvider, OPENAI, OpenAiProvider,
};
use pantry_backend::outbound::memory::{
    InMemoryCreditRepository, InMemoryPantryRepository, InMemoryRecipeRepository,
    InMemoryShoppingListRepository,
};
use pantry_backend::outbound::persistence::{
    DbPool, DieselCreditRepository, DieselPantryRepository, DieselRecipeRepository,
    DieselShoppingListRepository,
};

use super::config::{AppConfig, ProviderSettings};

/// Failure while assembling application state.
#[derive(Debug, thiserror::Error)]
pub enum StateBuildError {
    /// A provider rejected its configuration.
    #[error("language model provider setup failed: {0}")]
    Provider(#[from] LlmProviderError),
    /// Prompt templates failed to load.
    #[error("prompt templates failed to load: {0}")]
    Templates(String),
}

/// Repositories backing every driven port.
struct Repositories<C, P, R, S> {
    credits: Arc<C>,
    pantries: Arc<P>,
    recipes: Arc<R>,
    shopping_lists: Arc<S>,
}

fn vendor_provider(settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>, LlmProviderError> {
    let config = settings.config.clone();
    let provider: Arc<dyn LlmProvider> = match settings.name {
        OPENAI => Arc::new(OpenAiProvider::new(config)?),
        GEMINI => Arc::new(GeminiProvider::new(config)?),
        ANTHROPIC => Arc::new(AnthropicProvider::new(config)?),
        other => return Err(LlmProviderError::unknown_provider(other)),
    };
    Ok(provider)
}

/// Register every configured vendor and select the default.
///
/// # Errors
///
/// Returns [`LlmProviderError`] when a vendor rejects its settings or the
/// requested default is not registered.
pub fn build_provider_registry(config: &AppConfig) -> Result<ProviderRegistry, LlmProviderError> {
    let mut registry = ProviderRegistry::new();
    for settings in &config.providers {
        registry.register(vendor_provider(settings)?)?;
    }
    if let Some(active) = &config.active_provider {
        registry.set_provider(active)?;
    }
    info!(
        providers = ?registry.names(),
        active = ?registry.active_name(),
        "language model providers ready"
    );
    Ok(registry)
}

fn assemble<C, P, R, S>(
    repos: Repositories<C, P, R, S>,
    providers: ProviderRegistry,
    auth: Arc<JwtAuthenticator>,
    clock: Arc<dyn Clock>,
) -> Result<HttpState, StateBuildError>
where
    C: CreditRepository + 'static,
    P: PantryRepository + 'static,
    R: RecipeRepository + 'static,
    S: ShoppingListRepository + 'static,
{
    let templates = StaticPromptTemplates::new()
        .map_err(|error| StateBuildError::Templates(error.message().to_owned()))?;
    let ledger = Arc::new(CreditService::new(repos.credits));
    let pantries = Arc::new(PantryService::new(repos.pantries));
    let recipe_book = Arc::new(RecipeService::new(
        Arc::clone(&repos.recipes),
        Arc::clone(&clock),
    ));
    let pipeline = AiPipeline::new(
        AiPipelinePorts::new(
            ledger.clone(),
            pantries.clone(),
            repos.recipes,
            repos.shopping_lists,
            Arc::new(templates),
            Arc::new(providers),
        ),
        clock,
    );
    Ok(HttpState::new(
        HttpStatePorts {
            ledger,
            ai: Arc::new(pipeline),
            pantries,
            recipes: recipe_book,
        },
        auth,
    ))
}

/// Build handler state from configuration and an optional database pool.
///
/// # Errors
///
/// Returns [`StateBuildError`] when providers or prompt templates cannot be
/// set up.
pub fn build_http_state(
    config: &AppConfig,
    pool: Option<DbPool>,
) -> Result<web::Data<HttpState>, StateBuildError> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let auth = Arc::new(JwtAuthenticator::new(&config.auth, Arc::clone(&clock)));
    let providers = build_provider_registry(config)?;

    let state = match pool {
        Some(pool) => assemble(
            Repositories {
                credits: Arc::new(DieselCreditRepository::new(pool.clone())),
                pantries: Arc::new(DieselPantryRepository::new(pool.clone())),
                recipes: Arc::new(DieselRecipeRepository::new(pool.clone())),
                shopping_lists: Arc::new(DieselShoppingListRepository::new(pool)),
            },
            providers,
            auth,
            clock,
        )?,
        None => assemble(
            Repositories {
                credits: Arc::new(InMemoryCreditRepository::new(Arc::clone(&clock))),
                pantries: Arc::new(InMemoryPantryRepository::new(Arc::clone(&clock))),
                recipes: Arc::new(InMemoryRecipeRepository::default()),
                shopping_lists: Arc::new(InMemoryShoppingListRepository::default()),
            },
            providers,
            auth,
            clock,
        )?,
    };
    Ok(web::Data::new(state))
}
