use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::models::actor::Actor;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

fn bearer_claims(req: &Request, secret: &str) -> Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        unauthorized("invalid_token")
    })
}

/// Resolves the bearer token into an `Actor` request extension.
pub async fn require_actor(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = match bearer_claims(&req, &state.jwt_secret) {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let email = claims.email.unwrap_or_default().trim().to_lowercase();
    let role_claim_admin = claims
        .role
        .as_deref()
        .map_or(false, |role| role.eq_ignore_ascii_case("admin"));
    let is_admin = if role_claim_admin {
        true
    } else if email.is_empty() {
        false
    } else {
        match state.account_service.is_admin_email(&email).await {
            Ok(is_admin) => is_admin,
            Err(e) => return e.into_response(),
        }
    };

    let actor = Actor {
        name: claims
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone()),
        id: claims.sub,
        email,
        is_admin,
    };
    req.extensions_mut().insert(actor);
    next.run(req).await
}

/// Must run inside `require_actor`.
pub async fn require_admin(req: Request, next: Next) -> Response {
    let is_admin = req.extensions().get::<Actor>().map(|actor| actor.is_admin);
    match is_admin {
        Some(true) => next.run(req).await,
        Some(false) => {
            (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response()
        }
        None => unauthorized("missing_actor"),
    }
}
