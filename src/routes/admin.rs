use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::dto::candidate_dto::CandidateIdsPayload;
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::candidate::Candidate;
use crate::services::confirmation_service::{
    BatchConfirmationReport, BatchDeletionReport, ConfirmationOutcome, ReconcileReport,
};
use crate::utils::validation::validate;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/admin/candidates/{id}/confirm",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Confirmed; calendar failures are listed as warnings", body = ConfirmationOutcome),
        (status = 404, description = "Candidate not found"),
        (status = 409, description = "Slot is full or candidate already confirmed")
    )
)]
#[axum::debug_handler]
pub async fn confirm_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmationOutcome>> {
    let outcome = state
        .confirmation_service
        .confirm_one(id, &actor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/admin/candidates/confirm",
    request_body = CandidateIdsPayload,
    responses(
        (status = 200, description = "Every resolvable candidate confirmed", body = BatchConfirmationReport),
        (status = 409, description = "Batch rejected; every violating slot or candidate is listed")
    )
)]
#[axum::debug_handler]
pub async fn confirm_candidates(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CandidateIdsPayload>,
) -> Result<Json<BatchConfirmationReport>> {
    validate(&payload)?;
    let report = state
        .confirmation_service
        .confirm_batch(&payload.candidate_ids, &actor)
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/admin/candidates/{id}/revert",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate back to submitted; calendar events are kept", body = Candidate),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn revert_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Candidate>> {
    let candidate = state
        .confirmation_service
        .revert_to_submitted(id, &actor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?;
    Ok(Json(candidate))
}

#[utoipa::path(
    post,
    path = "/api/admin/candidates/delete",
    request_body = CandidateIdsPayload,
    responses(
        (status = 200, description = "Deleted ids, skipped ids and calendar warnings", body = BatchDeletionReport)
    )
)]
#[axum::debug_handler]
pub async fn delete_candidates(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CandidateIdsPayload>,
) -> Result<Json<BatchDeletionReport>> {
    validate(&payload)?;
    let report = state
        .confirmation_service
        .delete_batch(&payload.candidate_ids, &actor)
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/admin/calendar/reconcile",
    responses(
        (status = 200, description = "Candidates removed because their calendar event was deleted", body = ReconcileReport)
    )
)]
#[axum::debug_handler]
pub async fn reconcile_calendars(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ReconcileReport>> {
    let report = state
        .confirmation_service
        .reconcile_deleted_externally(&actor)
        .await?;
    Ok(Json(report))
}
