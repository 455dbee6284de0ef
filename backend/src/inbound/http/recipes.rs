//! Recipe HTTP handlers.
//!
//! ```text
//! POST /recipes/generate   (metered)
//! POST /recipes/chat       (metered)
//! POST /recipes/save
//! GET  /recipes
//! GET  /recipes/{id}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{ChatCommand, ChatReply};
use crate::domain::{
    AuthenticatedUser, DEFAULT_RECIPE_COUNT, Error, GeneratedRecipe, Recipe, RecipeRequest,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::context::call_context;
use crate::inbound::http::credit_guard::CreditGuard;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid};

/// Recipes produced or stored by one call.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipesResponse {
    pub message: String,
    pub recipes: Vec<Recipe>,
    pub count: usize,
}

impl RecipesResponse {
    fn new(message: &str, recipes: Vec<Recipe>) -> Self {
        Self {
            message: message.to_owned(),
            count: recipes.len(),
            recipes,
        }
    }
}

/// Body of `POST /recipes/save`: one recipe or an array of them.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SaveRecipesRequest {
    Many(Vec<GeneratedRecipe>),
    One(Box<GeneratedRecipe>),
}

impl SaveRecipesRequest {
    fn into_vec(self) -> Vec<GeneratedRecipe> {
        match self {
            Self::Many(recipes) => recipes,
            Self::One(recipe) => vec![*recipe],
        }
    }
}

/// Generate three recipes from the caller's pantry. Debits one credit.
#[utoipa::path(
    post,
    path = "/recipes/generate",
    request_body = RecipeRequest,
    responses(
        (status = 200, description = "Generated recipes", body = RecipesResponse),
        (status = 400, description = "Invalid request or empty pantry", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 402, description = "Insufficient credits", body = Error),
        (status = 403, description = "Not a pantry member", body = Error),
        (status = 500, description = "Model failure", body = Error)
    ),
    tags = ["recipes"],
    operation_id = "generateRecipes"
)]
#[post("/recipes/generate", wrap = "CreditGuard")]
pub async fn generate_recipes(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<RecipeRequest>,
) -> ApiResult<web::Json<RecipesResponse>> {
    let (context, _cancel_on_drop) = call_context(&user);
    let recipes = state
        .ai
        .generate_recipes(&context, &payload, DEFAULT_RECIPE_COUNT)
        .await?;
    Ok(web::Json(RecipesResponse::new(
        "Recipes generated successfully",
        recipes,
    )))
}

/// Free-form chat with the active model. Debits one credit.
#[utoipa::path(
    post,
    path = "/recipes/chat",
    request_body = ChatCommand,
    responses(
        (status = 200, description = "Assistant reply", body = ChatReply),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 402, description = "Insufficient credits", body = Error),
        (status = 500, description = "Model failure", body = Error)
    ),
    tags = ["recipes"],
    operation_id = "chat"
)]
#[post("/recipes/chat", wrap = "CreditGuard")]
pub async fn chat(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<ChatCommand>,
) -> ApiResult<web::Json<ChatReply>> {
    let (context, _cancel_on_drop) = call_context(&user);
    let reply = state.ai.chat(&context, &payload).await?;
    Ok(web::Json(reply))
}

/// Save one or many recipes to the caller's book.
#[utoipa::path(
    post,
    path = "/recipes/save",
    request_body = SaveRecipesRequest,
    responses(
        (status = 201, description = "Saved recipes", body = RecipesResponse),
        (status = 400, description = "Invalid recipe", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["recipes"],
    operation_id = "saveRecipes"
)]
#[post("/recipes/save")]
pub async fn save_recipes(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<SaveRecipesRequest>,
) -> ApiResult<HttpResponse> {
    let saved = state
        .recipes
        .save_recipes(&user.id(), payload.into_inner().into_vec())
        .await?;
    Ok(HttpResponse::Created().json(RecipesResponse::new("Recipes saved successfully", saved)))
}

/// List the caller's recipes, newest first.
#[utoipa::path(
    get,
    path = "/recipes",
    responses(
        (status = 200, description = "Recipes", body = [Recipe]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["recipes"],
    operation_id = "listRecipes"
)]
#[get("/recipes")]
pub async fn list_recipes(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<Vec<Recipe>>> {
    Ok(web::Json(state.recipes.list_recipes(&user.id()).await?))
}

/// Fetch one of the caller's recipes.
#[utoipa::path(
    get,
    path = "/recipes/{id}",
    params(("id" = String, Path, description = "Recipe identifier")),
    responses(
        (status = 200, description = "Recipe", body = Recipe),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Absent or owned by someone else", body = Error)
    ),
    tags = ["recipes"],
    operation_id = "getRecipe"
)]
#[get("/recipes/{id}")]
pub async fn get_recipe(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<Recipe>> {
    let recipe_id = parse_uuid(&path, FieldName::new("id"))?;
    Ok(web::Json(
        state.recipes.get_recipe(&user.id(), &recipe_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::{Value, json};

    use crate::domain::UserId;
    use crate::domain::llm::{ChatMessage, TokenUsage};
    use crate::inbound::http::test_utils::{TestPorts, bearer, wallet};
    use crate::inbound::http::validation::json_config;

    fn recipe(owner: UserId, title: &str) -> Recipe {
        serde_json::from_value::<GeneratedRecipe>(json!({"title": title}))
            .expect("minimal recipe")
            .into_recipe(owner, Utc::now())
    }

    fn with_credit(ports: &mut TestPorts) {
        ports
            .ledger
            .expect_ensure_credits()
            .returning(|id| Ok(wallet(*id, 10)));
    }

    async fn send(ports: TestPorts, request: test::TestRequest) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ports.into_state()))
                .app_data(json_config())
                .service(generate_recipes)
                .service(chat)
                .service(save_recipes)
                .service(list_recipes)
                .service(get_recipe),
        )
        .await;
        let res = test::call_service(&app, request.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[rstest]
    #[actix_web::test]
    async fn generate_asks_for_three_recipes() {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        with_credit(&mut ports);
        ports
            .ai
            .expect_generate_recipes()
            .withf(move |context, _, count| context.user_id() == user && *count == 3)
            .returning(|context, _, _| {
                Ok((0..3)
                    .map(|n| recipe(context.user_id(), &format!("Dish {n}")))
                    .collect())
            });

        let request = test::TestRequest::post()
            .uri("/recipes/generate")
            .insert_header(bearer(&user, &[]))
            .set_json(json!({"pantry_id": uuid::Uuid::new_v4()}));
        let (status, body) = send(ports, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["recipes"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["message"], "Recipes generated successfully");
    }

    #[rstest]
    #[actix_web::test]
    async fn empty_wallets_never_reach_the_model() {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        ports
            .ledger
            .expect_ensure_credits()
            .returning(|_| Err(Error::insufficient_credits("insufficient credits")));
        ports.ai.expect_chat().never();

        let request = test::TestRequest::post()
            .uri("/recipes/chat")
            .insert_header(bearer(&user, &[]))
            .set_json(json!({"messages": [{"role": "user", "content": "hi"}]}));
        let (status, body) = send(ports, request).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
    }

    #[rstest]
    #[actix_web::test]
    async fn chat_returns_the_assistant_reply() {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        with_credit(&mut ports);
        ports.ai.expect_chat().returning(|_, _| {
            Ok(ChatReply {
                message: ChatMessage::assistant("Try a frittata."),
                provider: "openai".to_owned(),
                model: "gpt-3.5-turbo".to_owned(),
                usage: TokenUsage::new(12, 5),
            })
        });

        let request = test::TestRequest::post()
            .uri("/recipes/chat")
            .insert_header(bearer(&user, &[]))
            .set_json(json!({"messages": [{"role": "user", "content": "eggs?"}]}));
        let (status, body) = send(ports, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"]["content"], "Try a frittata.");
        assert_eq!(body["message"]["role"], "assistant");
    }

    #[rstest]
    #[case(json!({"title": "Soup"}), 1)]
    #[case(json!([{"title": "Soup"}, {"title": "Salad"}]), 2)]
    #[actix_web::test]
    async fn save_accepts_one_or_many(#[case] payload: Value, #[case] expected: usize) {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        ports
            .recipes
            .expect_save_recipes()
            .withf(move |_, recipes| recipes.len() == expected)
            .returning(|id, recipes| {
                Ok(recipes
                    .into_iter()
                    .map(|generated| generated.into_recipe(*id, Utc::now()))
                    .collect())
            });

        let request = test::TestRequest::post()
            .uri("/recipes/save")
            .insert_header(bearer(&user, &[]))
            .set_json(payload);
        let (status, body) = send(ports, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["count"], expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn foreign_recipes_are_not_found() {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        ports
            .recipes
            .expect_get_recipe()
            .returning(|_, _| Err(Error::not_found("recipe not found")));

        let request = test::TestRequest::get()
            .uri(&format!("/recipes/{}", uuid::Uuid::new_v4()))
            .insert_header(bearer(&user, &[]));
        let (status, body) = send(ports, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_recipe_ids_are_bad_requests() {
        let user = UserId::random();
        let request = test::TestRequest::get()
            .uri("/recipes/not-a-uuid")
            .insert_header(bearer(&user, &[]));
        let (status, body) = send(TestPorts::default(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["code"], "invalid_uuid");
    }

    #[rstest]
    #[actix_web::test]
    async fn listing_returns_the_callers_book() {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        ports
            .recipes
            .expect_list_recipes()
            .returning(|id| Ok(vec![recipe(*id, "Newest"), recipe(*id, "Older")]));

        let request = test::TestRequest::get()
            .uri("/recipes")
            .insert_header(bearer(&user, &[]));
        let (status, body) = send(ports, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["title"], "Newest");
    }
}
