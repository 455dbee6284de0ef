//! Credit ledger HTTP handlers.
//!
//! ```text
//! GET  /credits/wallet
//! GET  /credits/transactions?type=&limit=&offset=&from=&to=
//! POST /credits/add
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::credits::{TransactionFilter, TransactionPage, Wallet};
use crate::domain::{AuthenticatedUser, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_user_id};

/// Admin grant payload.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddCreditRequest {
    /// Wallet owner receiving the credits.
    pub user_id: String,
    /// Credits to add; must be positive.
    pub amount: i32,
    /// Ledger note; a generic label is used when blank.
    #[serde(default)]
    pub description: Option<String>,
}

/// Fetch the caller's wallet, creating it with the opening grant on first use.
#[utoipa::path(
    get,
    path = "/credits/wallet",
    responses(
        (status = 200, description = "Wallet snapshot", body = Wallet),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["credits"],
    operation_id = "getWallet"
)]
#[get("/credits/wallet")]
pub async fn get_wallet(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<Wallet>> {
    let wallet = state.ledger.get_wallet(&user.id()).await?;
    Ok(web::Json(wallet))
}

/// Page through the caller's ledger, newest first.
#[utoipa::path(
    get,
    path = "/credits/transactions",
    params(TransactionFilter),
    responses(
        (status = 200, description = "Transaction page", body = TransactionPage),
        (status = 400, description = "Malformed filter", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["credits"],
    operation_id = "listTransactions"
)]
#[get("/credits/transactions")]
pub async fn list_transactions(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    filter: web::Query<TransactionFilter>,
) -> ApiResult<web::Json<TransactionPage>> {
    let page = state
        .ledger
        .list_transactions(&user.id(), &filter.into_inner())
        .await?;
    Ok(web::Json(page))
}

/// Grant credits to a user. Requires the `admin` role.
#[utoipa::path(
    post,
    path = "/credits/add",
    request_body = AddCreditRequest,
    responses(
        (status = 200, description = "Target wallet after the grant", body = Wallet),
        (status = 400, description = "Non-positive amount or bad user id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an administrator", body = Error)
    ),
    tags = ["credits"],
    operation_id = "addCredits"
)]
#[post("/credits/add")]
pub async fn add_credits(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<AddCreditRequest>,
) -> ApiResult<HttpResponse> {
    if !user.is_admin() {
        return Err(Error::forbidden("administrator role required"));
    }
    let AddCreditRequest {
        user_id,
        amount,
        description,
    } = payload.into_inner();
    let target = parse_user_id(&user_id, FieldName::new("user_id"))?;
    let wallet = state
        .ledger
        .add_credit(&user.id(), &target, amount, description.as_deref().unwrap_or_default())
        .await?;
    Ok(HttpResponse::Ok().json(wallet))
}
