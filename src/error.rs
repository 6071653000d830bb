use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

use crate::services::capacity_policy::SlotViolation;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot capacity exceeded for {} slot(s)", .0.len())]
    CapacityExceeded(Vec<SlotViolation>),

    #[error("Candidates already confirmed: {0:?}")]
    AlreadyConfirmed(Vec<Uuid>),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures talking to an external calendar account.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// 404 or 410 from the provider: the event does not exist (any more).
    #[error("calendar event not found")]
    NotFound,

    #[error("calendar access denied: {0}")]
    Unauthorized(String),

    #[error("no calendar credential stored for user {0}")]
    MissingCredential(String),

    #[error("calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cannot place slot in calendar time zone: {0}")]
    InvalidTime(String),
}

impl CalendarError {
    pub fn is_gone(&self) -> bool {
        matches!(self, CalendarError::NotFound)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Error::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            Error::CapacityExceeded(violations) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "capacity_exceeded",
                    "message": "At most two sessions can be confirmed for the same date and time slot",
                    "violations": violations,
                }),
            ),
            Error::AlreadyConfirmed(ids) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "already_confirmed",
                    "message": "Confirmed candidates cannot be confirmed again",
                    "candidate_ids": ids,
                }),
            ),
            Error::Calendar(err) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": format!("Calendar service error: {}", err) }),
            ),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Json(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": format!("External service error: {}", err) }),
            ),
            Error::Database(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            Error::Anyhow(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "An unexpected error occurred" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                Error::Conflict(db_err.message().to_string())
            }
            other => Error::Database(other),
        }
    }
}
