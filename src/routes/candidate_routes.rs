use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::database::store::CandidateFilter;
use crate::dto::candidate_dto::{CandidateListQuery, CreateCandidatePayload, UpdateCandidatePayload};
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::candidate::Candidate;
use crate::services::confirmation_service::DeletionOutcome;
use crate::utils::validation::validate;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/candidates",
    request_body = CreateCandidatePayload,
    responses(
        (status = 201, description = "Candidate submitted", body = Candidate),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateCandidatePayload>,
) -> Result<(StatusCode, Json<Candidate>)> {
    validate(&payload)?;
    let candidate = state.candidate_service.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[utoipa::path(
    get,
    path = "/api/candidates",
    params(
        ("status" = Option<String>, Query, description = "submitted or confirmed"),
        ("instructor_id" = Option<String>, Query, description = "Owner filter"),
        ("month" = Option<String>, Query, description = "YYYY-MM")
    ),
    responses(
        (status = 200, description = "Candidates ordered by date", body = Vec<Candidate>)
    )
)]
#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateListQuery>,
) -> Result<Json<Vec<Candidate>>> {
    let filter = CandidateFilter {
        status: query.status,
        instructor_id: query.instructor_id,
        month: query.month,
        ..Default::default()
    };
    let candidates = state.candidate_service.list(&filter).await?;
    Ok(Json(candidates))
}

#[utoipa::path(
    get,
    path = "/api/candidates/mine",
    responses(
        (status = 200, description = "The caller's own candidates", body = Vec<Candidate>)
    )
)]
#[axum::debug_handler]
pub async fn list_my_candidates(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Candidate>>> {
    let candidates = state.candidate_service.list_by_instructor(&actor.id).await?;
    Ok(Json(candidates))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate", body = Candidate),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Candidate>> {
    let candidate = state
        .candidate_service
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?;
    Ok(Json(candidate))
}

#[utoipa::path(
    patch,
    path = "/api/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    request_body = UpdateCandidatePayload,
    responses(
        (status = 200, description = "Candidate updated", body = Candidate),
        (status = 403, description = "Not the owner, or already confirmed"),
        (status = 404, description = "Candidate not found"),
        (status = 409, description = "Target slot is full")
    )
)]
#[axum::debug_handler]
pub async fn update_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCandidatePayload>,
) -> Result<Json<Candidate>> {
    validate(&payload)?;
    if state.candidate_service.get(id).await?.is_none() {
        return Err(Error::NotFound(format!("Candidate {} not found", id)));
    }
    let candidate = state
        .candidate_service
        .update(&actor, id, payload)
        .await?
        .ok_or_else(|| Error::Forbidden("You cannot edit this candidate".to_string()))?;
    Ok(Json(candidate))
}

#[utoipa::path(
    delete,
    path = "/api/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate deleted, with calendar warnings", body = DeletionOutcome),
        (status = 403, description = "Not the owner, or already confirmed"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletionOutcome>> {
    if state.candidate_service.get(id).await?.is_none() {
        return Err(Error::NotFound(format!("Candidate {} not found", id)));
    }
    let outcome = state
        .confirmation_service
        .delete_candidate(id, &actor, actor.is_admin)
        .await?;
    if !outcome.deleted {
        return Err(Error::Forbidden("You cannot delete this candidate".to_string()));
    }
    Ok(Json(outcome))
}
