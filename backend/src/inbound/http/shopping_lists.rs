//! AI shopping-list HTTP handler.
//!
//! ```text
//! POST /shopping-lists/generate   (metered)
//! ```

use actix_web::{post, web};

use crate::domain::{AiShoppingListRequest, AuthenticatedUser, Error, ShoppingList};
use crate::inbound::http::ApiResult;
use crate::inbound::http::context::call_context;
use crate::inbound::http::credit_guard::CreditGuard;
use crate::inbound::http::state::HttpState;

/// Plan a shopping list against the caller's pantry. Debits one credit.
#[utoipa::path(
    post,
    path = "/shopping-lists/generate",
    request_body = AiShoppingListRequest,
    responses(
        (status = 200, description = "Persisted shopping list", body = ShoppingList),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 402, description = "Insufficient credits", body = Error),
        (status = 403, description = "Not a pantry member", body = Error),
        (status = 500, description = "Model failure", body = Error)
    ),
    tags = ["shopping-lists"],
    operation_id = "generateShoppingList"
)]
#[post("/shopping-lists/generate", wrap = "CreditGuard")]
pub async fn generate_shopping_list(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<AiShoppingListRequest>,
) -> ApiResult<web::Json<ShoppingList>> {
    let (context, _cancel_on_drop) = call_context(&user);
    let list = state.ai.generate_shopping_list(&context, &payload).await?;
    Ok(web::Json(list))
}
