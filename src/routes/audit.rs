use axum::{extract::State, Json};

use crate::error::Result;
use crate::models::audit_log::AuditLogEntry;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    responses(
        (status = 200, description = "Confirmation history, newest first", body = Vec<AuditLogEntry>)
    )
)]
#[axum::debug_handler]
pub async fn list_audit_logs(State(state): State<AppState>) -> Result<Json<Vec<AuditLogEntry>>> {
    let entries = state.audit_service.list().await?;
    Ok(Json(entries))
}
