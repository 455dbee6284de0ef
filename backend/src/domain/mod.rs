//! Domain primitives, aggregates, and services.
//!
//! Purpose: Define strongly typed domain entities and the services that
//! operate on them through driven ports. Nothing here knows about HTTP or
//! SQL; adapters live under `inbound` and `outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - CreditService — wallet reads, debits, and grants.
//! - PantryService — pantry membership and authorisation.
//! - RecipeService — the caller's saved recipe book.
//! - AiPipeline — metered recipe, shopping-list, and chat generation.

pub mod ai_pipeline;
pub mod credits;
pub mod error;
mod lenient;
pub mod llm;
pub mod llm_response;
pub mod pantry;
pub mod pantry_service;
pub mod ports;
pub mod prompt;
pub mod recipe_service;
pub mod recipes;
pub mod shopping;
pub mod trace_id;
pub mod user;

pub use self::ai_pipeline::{AiPipeline, AiPipelinePorts, DEFAULT_RECIPE_COUNT, MAX_RECIPE_COUNT};
pub use self::credits::{
    CreditService, CreditTransaction, TransactionFilter, TransactionPage, TransactionQuery,
    TransactionType, Wallet,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::pantry::{
    Ingredient, MembershipChange, MembershipRole, PANTRY_NAME_MAX, Pantry, PantryId,
    PantryMembership, normalise_name,
};
pub use self::pantry_service::PantryService;
pub use self::recipe_service::RecipeService;
pub use self::recipes::{
    Difficulty, GeneratedRecipe, Instruction, MealType, NutritionInfo, Recipe, RecipeBrief,
    RecipeIngredient, RecipeRequest,
};
pub use self::shopping::{
    AiShoppingListRequest, DEFAULT_LIST_NAME, GeneratedShoppingItem, GeneratedShoppingList,
    ShoppingBrief, ShoppingList, ShoppingListItem,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{ADMIN_ROLE, AuthenticatedUser, UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use pantry_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
