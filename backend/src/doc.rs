//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP handler, the schemas they exchange, and
//! the bearer security scheme. Swagger UI serves it in debug builds.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{ChatCommand, ChatReply};
use crate::domain::{
    AiShoppingListRequest, CreditTransaction, Error, ErrorCode, GeneratedRecipe, Ingredient,
    Pantry, PantryMembership, Recipe, RecipeRequest, ShoppingList, TransactionPage, Wallet,
};
use crate::inbound::http::credits::AddCreditRequest;
use crate::inbound::http::pantries::{AddMemberRequest, CreatePantryRequest};
use crate::inbound::http::recipes::RecipesResponse;

/// Register the bearer JWT scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_owned());
        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Pantry backend API",
        description = "Credit-metered recipe, shopping-list, and chat generation over household pantries."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerAuth" = [])),
    paths(
        crate::inbound::http::credits::get_wallet,
        crate::inbound::http::credits::list_transactions,
        crate::inbound::http::credits::add_credits,
        crate::inbound::http::recipes::generate_recipes,
        crate::inbound::http::recipes::chat,
        crate::inbound::http::recipes::save_recipes,
        crate::inbound::http::recipes::list_recipes,
        crate::inbound::http::recipes::get_recipe,
        crate::inbound::http::shopping_lists::generate_shopping_list,
        crate::inbound::http::pantries::create_pantry,
        crate::inbound::http::pantries::list_ingredients,
        crate::inbound::http::pantries::add_member,
        crate::inbound::http::pantries::remove_member,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Wallet,
        CreditTransaction,
        TransactionPage,
        AddCreditRequest,
        RecipeRequest,
        GeneratedRecipe,
        Recipe,
        RecipesResponse,
        ChatCommand,
        ChatReply,
        AiShoppingListRequest,
        ShoppingList,
        Pantry,
        PantryMembership,
        Ingredient,
        CreatePantryRequest,
        AddMemberRequest,
    )),
    tags(
        (name = "credits", description = "Wallets, ledger history, and admin grants"),
        (name = "recipes", description = "Metered generation and the saved recipe book"),
        (name = "shopping-lists", description = "Metered shopping-list planning"),
        (name = "pantries", description = "Pantry creation and membership"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
