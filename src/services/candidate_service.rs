use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::database::store::{CandidateFilter, CandidateStore};
use crate::dto::candidate_dto::{CreateCandidatePayload, UpdateCandidatePayload};
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::services::capacity_policy::CapacityPolicy;
use crate::utils::time::now;

/// Candidate CRUD with the ownership rules applied.
///
/// Privilege failures are silent: a call the actor may not make returns
/// `None`/`false` and leaves the store untouched.
#[derive(Clone)]
pub struct CandidateService {
    store: Arc<dyn CandidateStore>,
}

impl CandidateService {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }

    /// Instructors always author their own candidates, whatever identity
    /// the payload names.
    pub async fn create(&self, actor: &Actor, payload: CreateCandidatePayload) -> Result<Candidate> {
        let (instructor_id, instructor_name) = if actor.is_admin {
            (
                payload.instructor_id.unwrap_or_else(|| actor.id.clone()),
                payload.instructor_name.unwrap_or_else(|| actor.name.clone()),
            )
        } else {
            (actor.id.clone(), actor.name.clone())
        };

        let candidate = Candidate::new_submission(
            instructor_id,
            instructor_name,
            payload.date,
            payload.time_slot,
            payload.memo.filter(|m| !m.trim().is_empty()),
            now(),
        );
        self.store.insert_candidate(&candidate).await?;
        info!(candidate_id = %candidate.id, instructor_id = %candidate.instructor_id, "Candidate submitted");
        Ok(candidate)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Candidate>> {
        self.store.fetch_candidate(id).await
    }

    pub async fn list(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        self.store.fetch_candidates(filter).await
    }

    pub async fn list_by_status(&self, status: CandidateStatus) -> Result<Vec<Candidate>> {
        self.list(&CandidateFilter::by_status(status)).await
    }

    pub async fn list_by_instructor(&self, instructor_id: &str) -> Result<Vec<Candidate>> {
        self.list(&CandidateFilter::by_instructor(instructor_id)).await
    }

    pub fn may_edit(actor: &Actor, candidate: &Candidate) -> bool {
        actor.is_admin || (actor.owns(&candidate.instructor_id) && !candidate.is_confirmed())
    }

    pub fn may_delete(actor: &Actor, candidate: &Candidate, privileged: bool) -> bool {
        privileged || (actor.owns(&candidate.instructor_id) && !candidate.is_confirmed())
    }

    /// Applies a partial update. Returns `None` if the candidate is missing
    /// or the actor may not edit it. Instructors cannot reassign ownership.
    ///
    /// Moving a confirmed candidate to another slot is checked against slot
    /// capacity like a fresh confirmation.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: UpdateCandidatePayload,
    ) -> Result<Option<Candidate>> {
        let Some(mut candidate) = self.store.fetch_candidate(id).await? else {
            return Ok(None);
        };
        if !Self::may_edit(actor, &candidate) {
            return Ok(None);
        }
        let payload = if actor.is_admin {
            payload
        } else {
            payload.without_ownership()
        };
        if payload.is_empty() {
            return Ok(Some(candidate));
        }

        let previous_slot = candidate.slot_key();
        if let Some(instructor_id) = payload.instructor_id {
            candidate.instructor_id = instructor_id;
        }
        if let Some(instructor_name) = payload.instructor_name {
            candidate.instructor_name = instructor_name;
        }
        if let Some(date) = payload.date {
            candidate.set_date(date);
        }
        if let Some(time_slot) = payload.time_slot {
            candidate.time_slot = time_slot;
        }
        if let Some(memo) = payload.memo {
            candidate.memo = Some(memo).filter(|m| !m.trim().is_empty());
        }

        if candidate.is_confirmed() && candidate.slot_key() != previous_slot {
            let (date, time_slot) = candidate.slot_key();
            let existing = self
                .store
                .fetch_candidates(&CandidateFilter::confirmed_in_slot(date, time_slot))
                .await?;
            CapacityPolicy::can_confirm(&candidate, &existing)
                .map_err(|violation| Error::CapacityExceeded(vec![violation]))?;
        }

        if !self.store.update_candidate(&candidate).await? {
            return Ok(None);
        }
        info!(candidate_id = %id, actor_id = %actor.id, "Candidate updated");
        Ok(Some(candidate))
    }

    /// Low-level status transition. Capacity and audit concerns belong to
    /// the confirmation workflow.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: CandidateStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Candidate>> {
        let Some(mut candidate) = self.store.fetch_candidate(id).await? else {
            return Ok(None);
        };
        candidate.transition(status, at);
        if !self.store.update_candidate(&candidate).await? {
            return Ok(None);
        }
        info!(candidate_id = %id, status = %status, "Candidate status changed");
        Ok(Some(candidate))
    }
}
