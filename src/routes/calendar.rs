use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::dto::calendar_dto::CalendarCredentialPayload;
use crate::error::Result;
use crate::models::actor::Actor;
use crate::utils::validation::validate;
use crate::AppState;

#[utoipa::path(
    put,
    path = "/api/calendar/credentials",
    request_body = CalendarCredentialPayload,
    responses(
        (status = 204, description = "Credential stored"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn put_credentials(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CalendarCredentialPayload>,
) -> Result<StatusCode> {
    validate(&payload)?;
    state
        .calendar_mirror
        .save_credential(&actor, payload.access_token, payload.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
