use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::dto::account_dto::{AccountListResponse, CreateAccountPayload, RemoveAccountPayload};
use crate::error::{Error, Result};
use crate::models::account_role::AccountRole;
use crate::models::actor::Actor;
use crate::utils::validation::validate;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/admin/accounts",
    responses(
        (status = 200, description = "Instructor and admin accounts", body = AccountListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<AccountListResponse>> {
    let accounts = state.account_service.list().await?;
    Ok(Json(accounts))
}

#[utoipa::path(
    post,
    path = "/api/admin/accounts",
    request_body = CreateAccountPayload,
    responses(
        (status = 201, description = "Account registered", body = AccountRole),
        (status = 400, description = "Invalid or already registered email")
    )
)]
#[axum::debug_handler]
pub async fn add_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountPayload>,
) -> Result<(StatusCode, Json<AccountRole>)> {
    validate(&payload)?;
    let account = state.account_service.add(&payload.email, payload.role).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/accounts",
    request_body = RemoveAccountPayload,
    responses(
        (status = 200, description = "Account removed"),
        (status = 400, description = "Cannot remove your own admin role"),
        (status = 404, description = "Account not found")
    )
)]
#[axum::debug_handler]
pub async fn remove_account(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<RemoveAccountPayload>,
) -> Result<Json<JsonValue>> {
    validate(&payload)?;
    if !state.account_service.remove(&actor, &payload.email).await? {
        return Err(Error::NotFound(format!("Account {} not found", payload.email)));
    }
    Ok(Json(json!({ "ok": true })))
}
