//! Pantry HTTP handlers.
//!
//! ```text
//! POST   /pantries
//! GET    /pantries/{id}/ingredients
//! POST   /pantries/{id}/members
//! DELETE /pantries/{id}/members/{user_id}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AuthenticatedUser, Error, Ingredient, MembershipChange, Pantry, PantryMembership,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_pantry_id, parse_user_id};

/// Payload for `POST /pantries`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreatePantryRequest {
    pub name: String,
}

/// Payload for `POST /pantries/{id}/members`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: String,
}

/// Create a pantry owned by the caller.
#[utoipa::path(
    post,
    path = "/pantries",
    request_body = CreatePantryRequest,
    responses(
        (status = 201, description = "Pantry created", body = Pantry),
        (status = 400, description = "Blank or overlong name", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["pantries"],
    operation_id = "createPantry"
)]
#[post("/pantries")]
pub async fn create_pantry(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<CreatePantryRequest>,
) -> ApiResult<HttpResponse> {
    let pantry = state.pantries.create_pantry(&user.id(), &payload.name).await?;
    Ok(HttpResponse::Created().json(pantry))
}

/// List the pantry's in-stock items. Members only.
#[utoipa::path(
    get,
    path = "/pantries/{id}/ingredients",
    params(("id" = String, Path, description = "Pantry identifier")),
    responses(
        (status = 200, description = "Items with positive quantity", body = [Ingredient]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Not a member", body = Error),
        (status = 404, description = "Unknown pantry", body = Error)
    ),
    tags = ["pantries"],
    operation_id = "listPantryIngredients"
)]
#[get("/pantries/{id}/ingredients")]
pub async fn list_ingredients(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<Ingredient>>> {
    let pantry_id = parse_pantry_id(&path)?;
    let items = state.pantries.list_ingredients(&user.id(), &pantry_id).await?;
    Ok(web::Json(items))
}

/// Add a member. Owners only; re-adding a live member changes nothing.
#[utoipa::path(
    post,
    path = "/pantries/{id}/members",
    params(("id" = String, Path, description = "Pantry identifier")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = PantryMembership),
        (status = 200, description = "Already a member", body = PantryMembership),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown pantry", body = Error)
    ),
    tags = ["pantries"],
    operation_id = "addPantryMember"
)]
#[post("/pantries/{id}/members")]
pub async fn add_member(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    payload: web::Json<AddMemberRequest>,
) -> ApiResult<HttpResponse> {
    let pantry_id = parse_pantry_id(&path)?;
    let member = parse_user_id(&payload.user_id, FieldName::new("user_id"))?;
    let change = state
        .pantries
        .add_member(&user.id(), &pantry_id, &member)
        .await?;
    Ok(match change {
        MembershipChange::Added(membership) => HttpResponse::Created().json(membership),
        MembershipChange::Unchanged(membership) => HttpResponse::Ok().json(membership),
    })
}

/// Remove a member. Owners only; the owner cannot remove themself.
#[utoipa::path(
    delete,
    path = "/pantries/{id}/members/{user_id}",
    params(
        ("id" = String, Path, description = "Pantry identifier"),
        ("user_id" = String, Path, description = "Member to remove")
    ),
    responses(
        (status = 204, description = "Membership removed"),
        (status = 400, description = "Owner tried to leave", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown pantry or member", body = Error)
    ),
    tags = ["pantries"],
    operation_id = "removePantryMember"
)]
#[delete("/pantries/{id}/members/{user_id}")]
pub async fn remove_member(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (pantry, member) = path.into_inner();
    let pantry_id = parse_pantry_id(&pantry)?;
    let member = parse_user_id(&member, FieldName::new("user_id"))?;
    state
        .pantries
        .remove_member(&user.id(), &pantry_id, &member)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
