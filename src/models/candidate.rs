use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// The two fixed nightly windows a candidate may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "21:00-23:00")]
    SlotA,
    #[serde(rename = "22:00-24:00")]
    SlotB,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 2] = [TimeSlot::SlotA, TimeSlot::SlotB];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::SlotA => "21:00-23:00",
            TimeSlot::SlotB => "22:00-24:00",
        }
    }

    pub fn start_hour(&self) -> u32 {
        match self {
            TimeSlot::SlotA => 21,
            TimeSlot::SlotB => 22,
        }
    }

    /// May be 24, meaning midnight at the start of the next day.
    pub fn end_hour(&self) -> u32 {
        match self {
            TimeSlot::SlotA => 23,
            TimeSlot::SlotB => 24,
        }
    }

    pub fn label(&self) -> String {
        format!("{}:00-{}:00", self.start_hour(), self.end_hour())
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| Error::BadRequest(format!("Unknown time slot: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Submitted,
    Confirmed,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Submitted => "submitted",
            CandidateStatus::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(CandidateStatus::Submitted),
            "confirmed" => Ok(CandidateStatus::Confirmed),
            other => Err(Error::BadRequest(format!("Unknown candidate status: {}", other))),
        }
    }
}

/// A proposed session date/time submitted by an instructor.
///
/// `confirmed_at` is present exactly when `status` is `Confirmed`. The
/// calendar event ids are only ever set after a confirmation, and may stay
/// empty if mirroring failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub instructor_id: String,
    pub instructor_name: String,
    pub month: String,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub memo: Option<String>,
    pub status: CandidateStatus,
    pub submitted_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub instructor_calendar_event_id: Option<String>,
    pub admin_calendar_event_id: Option<String>,
    pub admin_calendar_user_id: Option<String>,
}

impl Candidate {
    pub fn new_submission(
        instructor_id: String,
        instructor_name: String,
        date: NaiveDate,
        time_slot: TimeSlot,
        memo: Option<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instructor_id,
            instructor_name,
            month: month_key(date),
            date,
            time_slot,
            memo,
            status: CandidateStatus::Submitted,
            submitted_at,
            confirmed_at: None,
            instructor_calendar_event_id: None,
            admin_calendar_event_id: None,
            admin_calendar_user_id: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == CandidateStatus::Confirmed
    }

    pub fn slot_key(&self) -> (NaiveDate, TimeSlot) {
        (self.date, self.time_slot)
    }

    pub fn has_calendar_event(&self) -> bool {
        self.instructor_calendar_event_id.is_some() || self.admin_calendar_event_id.is_some()
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.month = month_key(date);
    }

    /// Moves the candidate to `status`, keeping `confirmed_at` in step.
    /// Calendar event ids are deliberately left alone on revert.
    pub fn transition(&mut self, status: CandidateStatus, at: DateTime<Utc>) {
        match status {
            CandidateStatus::Confirmed => {
                if self.status != CandidateStatus::Confirmed {
                    self.confirmed_at = Some(at);
                }
            }
            CandidateStatus::Submitted => self.confirmed_at = None,
        }
        self.status = status;
    }
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Storage shape of `session_candidates`.
#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub instructor_id: String,
    pub instructor_name: String,
    pub month: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub memo: Option<String>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub google_calendar_event_id: Option<String>,
    pub admin_google_calendar_event_id: Option<String>,
    pub admin_calendar_user_id: Option<String>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = Error;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        let time_slot = row.time_slot.parse::<TimeSlot>().map_err(|_| {
            Error::Internal(format!(
                "Candidate {} has unknown time_slot '{}'",
                row.id, row.time_slot
            ))
        })?;
        let status = row.status.parse::<CandidateStatus>().map_err(|_| {
            Error::Internal(format!(
                "Candidate {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Candidate {
            id: row.id,
            instructor_id: row.instructor_id,
            instructor_name: row.instructor_name,
            month: row.month,
            date: row.date,
            time_slot,
            memo: row.memo,
            status,
            submitted_at: row.submitted_at,
            confirmed_at: row.confirmed_at,
            instructor_calendar_event_id: row.google_calendar_event_id,
            admin_calendar_event_id: row.admin_google_calendar_event_id,
            admin_calendar_user_id: row.admin_calendar_user_id,
        })
    }
}

impl From<&Candidate> for CandidateRow {
    fn from(candidate: &Candidate) -> Self {
        CandidateRow {
            id: candidate.id,
            instructor_id: candidate.instructor_id.clone(),
            instructor_name: candidate.instructor_name.clone(),
            month: candidate.month.clone(),
            date: candidate.date,
            time_slot: candidate.time_slot.as_str().to_string(),
            memo: candidate.memo.clone(),
            status: candidate.status.as_str().to_string(),
            submitted_at: candidate.submitted_at,
            confirmed_at: candidate.confirmed_at,
            google_calendar_event_id: candidate.instructor_calendar_event_id.clone(),
            admin_google_calendar_event_id: candidate.admin_calendar_event_id.clone(),
            admin_calendar_user_id: candidate.admin_calendar_user_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Candidate {
        Candidate::new_submission(
            "inst-1".into(),
            "Sato".into(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            TimeSlot::SlotB,
            Some("first half only".into()),
            Utc::now(),
        )
    }

    #[test]
    fn time_slot_uses_catalog_strings() {
        assert_eq!("22:00-24:00".parse::<TimeSlot>().unwrap(), TimeSlot::SlotB);
        assert!("20:00-22:00".parse::<TimeSlot>().is_err());
        assert_eq!(
            serde_json::to_string(&TimeSlot::SlotA).unwrap(),
            "\"21:00-23:00\""
        );
    }

    #[test]
    fn new_submission_derives_month_and_has_no_confirmation() {
        let candidate = sample();
        assert_eq!(candidate.month, "2026-02");
        assert_eq!(candidate.status, CandidateStatus::Submitted);
        assert!(candidate.confirmed_at.is_none());
        assert!(!candidate.has_calendar_event());
    }

    #[test]
    fn transition_keeps_confirmed_at_in_step_with_status() {
        let mut candidate = sample();
        let at = Utc::now();
        candidate.transition(CandidateStatus::Confirmed, at);
        assert_eq!(candidate.confirmed_at, Some(at));

        candidate.instructor_calendar_event_id = Some("evt-1".into());
        candidate.transition(CandidateStatus::Submitted, Utc::now());
        assert!(candidate.confirmed_at.is_none());
        assert_eq!(candidate.instructor_calendar_event_id.as_deref(), Some("evt-1"));
    }

    #[test]
    fn row_mapping_accounts_for_every_field() {
        let mut candidate = sample();
        candidate.transition(CandidateStatus::Confirmed, Utc::now());
        candidate.instructor_calendar_event_id = Some("evt-i".into());
        candidate.admin_calendar_event_id = Some("evt-a".into());
        candidate.admin_calendar_user_id = Some("admin-1".into());

        let row = CandidateRow::from(&candidate);
        assert_eq!(row.time_slot, "22:00-24:00");
        assert_eq!(row.status, "confirmed");
        assert_eq!(Candidate::try_from(row).unwrap(), candidate);
    }

    #[test]
    fn row_with_unknown_slot_is_rejected() {
        let mut row = CandidateRow::from(&sample());
        row.time_slot = "23:00-01:00".into();
        assert!(matches!(Candidate::try_from(row), Err(Error::Internal(_))));
    }
}
