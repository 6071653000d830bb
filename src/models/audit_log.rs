use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Error;
use crate::models::actor::Actor;
use crate::models::candidate::{Candidate, CandidateStatus, TimeSlot};

/// Append-only record of a confirmation. The candidate fields are a snapshot
/// taken at confirmation time so history survives later edits or deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub action: CandidateStatus,
    pub actor_id: String,
    pub actor_name: String,
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub instructor_id: String,
    pub instructor_name: String,
}

impl AuditLogEntry {
    pub fn confirmation(actor: &Actor, candidate: &Candidate, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id: candidate.id,
            action: CandidateStatus::Confirmed,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            timestamp,
            date: candidate.date,
            time_slot: candidate.time_slot,
            instructor_id: candidate.instructor_id.clone(),
            instructor_name: candidate.instructor_name.clone(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub action: String,
    pub admin_id: String,
    pub admin_name: String,
    pub timestamp: DateTime<Utc>,
    pub event_date: NaiveDate,
    pub event_time_slot: String,
    pub instructor_id: String,
    pub instructor_name: String,
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = Error;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let action = row
            .action
            .parse::<CandidateStatus>()
            .map_err(|_| Error::Internal(format!("Audit entry {} has unknown action", row.id)))?;
        let time_slot = row
            .event_time_slot
            .parse::<TimeSlot>()
            .map_err(|_| Error::Internal(format!("Audit entry {} has unknown time slot", row.id)))?;

        Ok(AuditLogEntry {
            id: row.id,
            candidate_id: row.event_id,
            action,
            actor_id: row.admin_id,
            actor_name: row.admin_name,
            timestamp: row.timestamp,
            date: row.event_date,
            time_slot,
            instructor_id: row.instructor_id,
            instructor_name: row.instructor_name,
        })
    }
}

impl From<&AuditLogEntry> for AuditLogRow {
    fn from(entry: &AuditLogEntry) -> Self {
        AuditLogRow {
            id: entry.id,
            event_id: entry.candidate_id,
            action: entry.action.as_str().to_string(),
            admin_id: entry.actor_id.clone(),
            admin_name: entry.actor_name.clone(),
            timestamp: entry.timestamp,
            event_date: entry.date,
            event_time_slot: entry.time_slot.as_str().to_string(),
            instructor_id: entry.instructor_id.clone(),
            instructor_name: entry.instructor_name.clone(),
        }
    }
}
