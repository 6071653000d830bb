//! Candidate confirmation, revert and deletion, with calendar mirroring.
//!
//! Local state is committed first. Calendar calls come afterwards and
//! their failures are returned as warnings next to the primary result.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::store::{CandidateFilter, CandidateStore};
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::audit_log::AuditLogEntry;
use crate::models::calendar_event::{CalendarTarget, SessionTitle, INSTRUCTOR_EVENT_TITLE};
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::services::audit_service::AuditService;
use crate::services::calendar_service::CalendarMirror;
use crate::services::candidate_service::CandidateService;
use crate::services::capacity_policy::CapacityPolicy;
use crate::utils::time::now;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorOperation {
    Create,
    Delete,
    Probe,
}

/// A calendar side effect that failed while the local change went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorWarning {
    pub candidate_id: Uuid,
    pub instructor_name: String,
    pub target: CalendarTarget,
    pub operation: MirrorOperation,
    pub message: String,
}

impl MirrorWarning {
    fn new(
        candidate: &Candidate,
        target: CalendarTarget,
        operation: MirrorOperation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            candidate_id: candidate.id,
            instructor_name: candidate.instructor_name.clone(),
            target,
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationOutcome {
    pub candidate: Candidate,
    /// Absent when the audit write failed; the confirmation still stands.
    pub audit_entry: Option<AuditLogEntry>,
    pub title: SessionTitle,
    pub warnings: Vec<MirrorWarning>,
}

/// A batch member whose confirmation could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedConfirmation {
    pub candidate_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfirmationReport {
    pub confirmed: Vec<ConfirmationOutcome>,
    /// Requested ids that did not resolve to a candidate.
    pub missing: Vec<Uuid>,
    /// Members left unconfirmed by a store error. Earlier members stay confirmed.
    pub failed: Vec<FailedConfirmation>,
    pub warnings: Vec<MirrorWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionOutcome {
    pub candidate_id: Uuid,
    pub deleted: bool,
    pub warnings: Vec<MirrorWarning>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeletionReport {
    pub deleted: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
    pub warnings: Vec<MirrorWarning>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub checked: usize,
    pub removed: Vec<Uuid>,
    pub warnings: Vec<MirrorWarning>,
}

fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn event_description(candidate: &Candidate, target: CalendarTarget) -> String {
    match target {
        CalendarTarget::Instructor => format!(
            "Registered by the consultation scheduler\nInstructor: {}",
            candidate.instructor_name
        ),
        CalendarTarget::Admin => format!(
            "Registered by the consultation scheduler (staff copy)\nInstructor: {}",
            candidate.instructor_name
        ),
    }
}

#[derive(Clone)]
pub struct ConfirmationService {
    store: Arc<dyn CandidateStore>,
    candidates: CandidateService,
    audit: AuditService,
    mirror: CalendarMirror,
}

impl ConfirmationService {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        audit: AuditService,
        mirror: CalendarMirror,
    ) -> Self {
        Self {
            candidates: CandidateService::new(store.clone()),
            store,
            audit,
            mirror,
        }
    }

    /// Confirms one candidate. `Ok(None)` if it does not exist.
    pub async fn confirm_one(&self, id: Uuid, actor: &Actor) -> Result<Option<ConfirmationOutcome>> {
        let Some(candidate) = self.store.fetch_candidate(id).await? else {
            return Ok(None);
        };
        if candidate.is_confirmed() {
            return Err(Error::AlreadyConfirmed(vec![id]));
        }

        let (date, time_slot) = candidate.slot_key();
        let existing = self
            .store
            .fetch_candidates(&CandidateFilter::confirmed_in_slot(date, time_slot))
            .await?;
        if let Err(violation) = CapacityPolicy::can_confirm(&candidate, &existing) {
            info!(candidate_id = %id, %date, slot = %time_slot, "Confirmation rejected: slot full");
            return Err(Error::CapacityExceeded(vec![violation]));
        }

        self.apply_confirmation(candidate, actor).await
    }

    /// Validates the whole batch against one snapshot of confirmed
    /// candidates, then confirms members one after another.
    pub async fn confirm_batch(&self, ids: &[Uuid], actor: &Actor) -> Result<BatchConfirmationReport> {
        let mut report = BatchConfirmationReport::default();
        let mut batch = Vec::new();
        for id in dedup_ids(ids) {
            match self.store.fetch_candidate(id).await? {
                Some(candidate) => batch.push(candidate),
                None => report.missing.push(id),
            }
        }

        let already: Vec<Uuid> = batch.iter().filter(|c| c.is_confirmed()).map(|c| c.id).collect();
        if !already.is_empty() {
            return Err(Error::AlreadyConfirmed(already));
        }

        let snapshot = self
            .store
            .fetch_candidates(&CandidateFilter::by_status(CandidateStatus::Confirmed))
            .await?;
        if let Err(violations) = CapacityPolicy::can_confirm_batch(&batch, &snapshot) {
            info!(
                batch_size = batch.len(),
                violations = violations.len(),
                "Batch confirmation rejected"
            );
            return Err(Error::CapacityExceeded(violations));
        }

        for candidate in batch {
            let id = candidate.id;
            match self.apply_confirmation(candidate, actor).await {
                Ok(Some(outcome)) => {
                    report.warnings.extend(outcome.warnings.iter().cloned());
                    report.confirmed.push(outcome);
                }
                Ok(None) => report.missing.push(id),
                Err(e) => {
                    error!(candidate_id = %id, error = %e, "Batch member confirmation failed");
                    report.failed.push(FailedConfirmation {
                        candidate_id: id,
                        message: e.to_string(),
                    });
                }
            }
        }
        info!(
            confirmed = report.confirmed.len(),
            failed = report.failed.len(),
            warnings = report.warnings.len(),
            "Batch confirmation applied"
        );
        Ok(report)
    }

    async fn apply_confirmation(
        &self,
        mut candidate: Candidate,
        actor: &Actor,
    ) -> Result<Option<ConfirmationOutcome>> {
        let confirmed_at = now();
        candidate.transition(CandidateStatus::Confirmed, confirmed_at);
        if !self.store.update_candidate(&candidate).await? {
            return Ok(None);
        }
        info!(candidate_id = %candidate.id, actor_id = %actor.id, "Candidate confirmed");

        let audit_entry = match self.audit.record_confirmation(actor, &candidate, confirmed_at).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!(candidate_id = %candidate.id, error = %e, "Failed to write audit entry");
                None
            }
        };

        let (date, time_slot) = candidate.slot_key();
        let position = self
            .store
            .fetch_candidates(&CandidateFilter::confirmed_in_slot(date, time_slot))
            .await?
            .len();
        let title = SessionTitle::for_position(position);

        let mut warnings = Vec::new();
        let instructor_event = self
            .mirror
            .add_event(
                &candidate.instructor_id,
                date,
                time_slot,
                INSTRUCTOR_EVENT_TITLE,
                &event_description(&candidate, CalendarTarget::Instructor),
            )
            .await;
        let instructor_event_id = match instructor_event {
            Ok(event_id) => Some(event_id),
            Err(e) => {
                warn!(candidate_id = %candidate.id, user_id = %candidate.instructor_id, error = %e, "Instructor calendar mirror failed");
                warnings.push(MirrorWarning::new(
                    &candidate,
                    CalendarTarget::Instructor,
                    MirrorOperation::Create,
                    e.to_string(),
                ));
                None
            }
        };

        let admin_event = self
            .mirror
            .add_event(
                &actor.id,
                date,
                time_slot,
                &title.admin_title(&candidate.instructor_name),
                &event_description(&candidate, CalendarTarget::Admin),
            )
            .await;
        let admin_event_id = match admin_event {
            Ok(event_id) => Some(event_id),
            Err(e) => {
                warn!(candidate_id = %candidate.id, user_id = %actor.id, error = %e, "Admin calendar mirror failed");
                warnings.push(MirrorWarning::new(
                    &candidate,
                    CalendarTarget::Admin,
                    MirrorOperation::Create,
                    e.to_string(),
                ));
                None
            }
        };

        let pending: Vec<CalendarTarget> = [
            (CalendarTarget::Instructor, instructor_event_id.is_some()),
            (CalendarTarget::Admin, admin_event_id.is_some()),
        ]
        .into_iter()
        .filter_map(|(target, created)| created.then_some(target))
        .collect();
        if !pending.is_empty() {
            match self
                .record_event_ids(candidate.id, instructor_event_id, admin_event_id, &actor.id)
                .await
            {
                Ok(Some(updated)) => candidate = updated,
                Ok(None) => {}
                Err(e) => {
                    error!(candidate_id = %candidate.id, error = %e, "Failed to store calendar event ids");
                    for target in pending {
                        warnings.push(MirrorWarning::new(
                            &candidate,
                            target,
                            MirrorOperation::Create,
                            format!("event created but its id could not be stored: {}", e),
                        ));
                    }
                }
            }
        }

        Ok(Some(ConfirmationOutcome {
            candidate,
            audit_entry,
            title,
            warnings,
        }))
    }

    /// Re-reads the row before writing so concurrent edits are kept.
    async fn record_event_ids(
        &self,
        id: Uuid,
        instructor_event_id: Option<String>,
        admin_event_id: Option<String>,
        admin_user_id: &str,
    ) -> Result<Option<Candidate>> {
        let Some(mut candidate) = self.store.fetch_candidate(id).await? else {
            return Ok(None);
        };
        if let Some(event_id) = instructor_event_id {
            candidate.instructor_calendar_event_id = Some(event_id);
        }
        if let Some(event_id) = admin_event_id {
            candidate.admin_calendar_event_id = Some(event_id);
            candidate.admin_calendar_user_id = Some(admin_user_id.to_string());
        }
        if !self.store.update_candidate(&candidate).await? {
            return Ok(None);
        }
        Ok(Some(candidate))
    }

    /// Admin-only. Stored calendar event ids and the external events are
    /// left as they are.
    pub async fn revert_to_submitted(&self, id: Uuid, actor: &Actor) -> Result<Option<Candidate>> {
        if !actor.is_admin {
            return Ok(None);
        }
        let reverted = self
            .candidates
            .set_status(id, CandidateStatus::Submitted, now())
            .await?;
        if let Some(candidate) = &reverted {
            if candidate.has_calendar_event() {
                warn!(candidate_id = %id, "Reverted candidate still holds calendar events");
            }
        }
        Ok(reverted)
    }

    /// Removes the candidate, deleting its calendar events first when it is
    /// confirmed. Calendar failures become warnings and never stop the delete.
    pub async fn delete_candidate(
        &self,
        id: Uuid,
        actor: &Actor,
        privileged: bool,
    ) -> Result<DeletionOutcome> {
        let mut outcome = DeletionOutcome {
            candidate_id: id,
            deleted: false,
            warnings: Vec::new(),
        };
        let Some(candidate) = self.store.fetch_candidate(id).await? else {
            return Ok(outcome);
        };
        if !CandidateService::may_delete(actor, &candidate, privileged) {
            return Ok(outcome);
        }

        if candidate.is_confirmed() && candidate.has_calendar_event() {
            outcome.warnings = self.delete_events(&candidate, actor, None).await;
        }

        outcome.deleted = self.store.delete_candidate(id).await?;
        if outcome.deleted {
            info!(candidate_id = %id, actor_id = %actor.id, warnings = outcome.warnings.len(), "Candidate deleted");
        }
        Ok(outcome)
    }

    /// Deletes each candidate in order with admin privilege where the actor
    /// has it. Warnings from every member are collected.
    pub async fn delete_batch(&self, ids: &[Uuid], actor: &Actor) -> Result<BatchDeletionReport> {
        let mut report = BatchDeletionReport::default();
        for id in dedup_ids(ids) {
            let outcome = self.delete_candidate(id, actor, actor.is_admin).await?;
            report.warnings.extend(outcome.warnings);
            if outcome.deleted {
                report.deleted.push(id);
            } else {
                report.skipped.push(id);
            }
        }
        Ok(report)
    }

    /// Deletes the candidate's mirrored events, optionally skipping one side.
    async fn delete_events(
        &self,
        candidate: &Candidate,
        actor: &Actor,
        skip: Option<CalendarTarget>,
    ) -> Vec<MirrorWarning> {
        let mut warnings = Vec::new();
        if skip != Some(CalendarTarget::Instructor) {
            if let Some(event_id) = &candidate.instructor_calendar_event_id {
                if let Err(e) = self.mirror.delete_event(&candidate.instructor_id, event_id).await {
                    warn!(candidate_id = %candidate.id, event_id = %event_id, error = %e, "Instructor calendar delete failed");
                    warnings.push(MirrorWarning::new(
                        candidate,
                        CalendarTarget::Instructor,
                        MirrorOperation::Delete,
                        e.to_string(),
                    ));
                }
            }
        }
        if skip != Some(CalendarTarget::Admin) {
            if let Some(event_id) = &candidate.admin_calendar_event_id {
                let admin_user_id = candidate.admin_calendar_user_id.as_deref().unwrap_or(&actor.id);
                if let Err(e) = self.mirror.delete_event(admin_user_id, event_id).await {
                    warn!(candidate_id = %candidate.id, event_id = %event_id, error = %e, "Admin calendar delete failed");
                    warnings.push(MirrorWarning::new(
                        candidate,
                        CalendarTarget::Admin,
                        MirrorOperation::Delete,
                        e.to_string(),
                    ));
                }
            }
        }
        warnings
    }

    /// `Some(true)` present, `Some(false)` gone, `None` when no event id is
    /// held on that side. Probe failures count as present.
    async fn probe(
        &self,
        candidate: &Candidate,
        target: CalendarTarget,
        actor: &Actor,
        warnings: &mut Vec<MirrorWarning>,
    ) -> Option<bool> {
        let (user_id, event_id) = match target {
            CalendarTarget::Instructor => (
                candidate.instructor_id.as_str(),
                candidate.instructor_calendar_event_id.as_deref()?,
            ),
            CalendarTarget::Admin => (
                candidate.admin_calendar_user_id.as_deref().unwrap_or(&actor.id),
                candidate.admin_calendar_event_id.as_deref()?,
            ),
        };
        match self.mirror.event_exists(user_id, event_id).await {
            Ok(exists) => Some(exists),
            Err(e) => {
                warn!(candidate_id = %candidate.id, user_id, event_id, error = %e, "Calendar probe failed");
                warnings.push(MirrorWarning::new(
                    candidate,
                    target,
                    MirrorOperation::Probe,
                    e.to_string(),
                ));
                Some(true)
            }
        }
    }

    /// Removes confirmed candidates whose event was deleted directly in
    /// either calendar, after deleting the event on the other side.
    pub async fn reconcile_deleted_externally(&self, actor: &Actor) -> Result<ReconcileReport> {
        let candidates = self
            .store
            .fetch_candidates(&CandidateFilter {
                status: Some(CandidateStatus::Confirmed),
                with_calendar_event: true,
                ..Default::default()
            })
            .await?;

        let mut report = ReconcileReport {
            checked: candidates.len(),
            ..Default::default()
        };
        for candidate in candidates {
            let gone_side = if self
                .probe(&candidate, CalendarTarget::Instructor, actor, &mut report.warnings)
                .await
                == Some(false)
            {
                Some(CalendarTarget::Instructor)
            } else if self
                .probe(&candidate, CalendarTarget::Admin, actor, &mut report.warnings)
                .await
                == Some(false)
            {
                Some(CalendarTarget::Admin)
            } else {
                None
            };

            let Some(gone_side) = gone_side else {
                continue;
            };
            info!(candidate_id = %candidate.id, side = %gone_side, "Calendar event deleted externally");
            let warnings = self.delete_events(&candidate, actor, Some(gone_side)).await;
            report.warnings.extend(warnings);
            if self.store.delete_candidate(candidate.id).await? {
                report.removed.push(candidate.id);
            }
        }

        info!(
            checked = report.checked,
            removed = report.removed.len(),
            "Calendar reconciliation finished"
        );
        Ok(report)
    }
}
