use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::{CandidateStatus, TimeSlot};

/// New candidate. Instructor identity fields are only honoured for admins;
/// instructors always submit as themselves.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1))]
    pub instructor_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub instructor_name: Option<String>,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    #[validate(length(max = 2000))]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCandidatePayload {
    #[validate(length(min = 1))]
    pub instructor_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub instructor_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
    #[validate(length(max = 2000))]
    pub memo: Option<String>,
}

impl UpdateCandidatePayload {
    pub fn without_ownership(self) -> Self {
        Self {
            instructor_id: None,
            instructor_name: None,
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructor_id.is_none()
            && self.instructor_name.is_none()
            && self.date.is_none()
            && self.time_slot.is_none()
            && self.memo.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateListQuery {
    pub status: Option<CandidateStatus>,
    pub instructor_id: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CandidateIdsPayload {
    #[validate(length(min = 1, max = 200))]
    pub candidate_ids: Vec<Uuid>,
}
