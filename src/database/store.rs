//! Row-store collaborators used by the scheduling core.
//!
//! Each trait covers one table. Implementations do plain CRUD and
//! filter-by-column reads; ownership and privilege rules live in the
//! services, not here.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::account_role::AccountRole;
use crate::models::audit_log::AuditLogEntry;
use crate::models::calendar_credential::CalendarCredential;
use crate::models::candidate::{Candidate, CandidateStatus, TimeSlot};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    pub status: Option<CandidateStatus>,
    pub instructor_id: Option<String>,
    pub month: Option<String>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
    /// Only rows holding at least one calendar event id.
    pub with_calendar_event: bool,
}

impl CandidateFilter {
    pub fn by_status(status: CandidateStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn by_instructor(instructor_id: impl Into<String>) -> Self {
        Self {
            instructor_id: Some(instructor_id.into()),
            ..Default::default()
        }
    }

    pub fn confirmed_in_slot(date: NaiveDate, time_slot: TimeSlot) -> Self {
        Self {
            status: Some(CandidateStatus::Confirmed),
            date: Some(date),
            time_slot: Some(time_slot),
            ..Default::default()
        }
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.status.map_or(true, |s| candidate.status == s)
            && self
                .instructor_id
                .as_deref()
                .map_or(true, |id| candidate.instructor_id == id)
            && self.month.as_deref().map_or(true, |m| candidate.month == m)
            && self.date.map_or(true, |d| candidate.date == d)
            && self.time_slot.map_or(true, |t| candidate.time_slot == t)
            && (!self.with_calendar_event || candidate.has_calendar_event())
    }
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()>;

    async fn fetch_candidate(&self, id: Uuid) -> Result<Option<Candidate>>;

    /// Results are ordered by date ascending, then submission time.
    async fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>>;

    /// Replaces the stored row. Returns false when the id no longer exists.
    async fn update_candidate(&self, candidate: &Candidate) -> Result<bool>;

    async fn delete_candidate(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Newest first.
    async fn fetch_audit_entries(&self) -> Result<Vec<AuditLogEntry>>;
}

#[async_trait]
pub trait AccountRoleStore: Send + Sync {
    /// Newest first.
    async fn fetch_account_roles(&self) -> Result<Vec<AccountRole>>;

    async fn find_account_role(&self, email: &str) -> Result<Option<AccountRole>>;

    /// Fails with `Error::Conflict` if the email is already registered.
    async fn insert_account_role(&self, role: &AccountRole) -> Result<()>;

    async fn delete_account_role(&self, email: &str) -> Result<bool>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn fetch_credential(&self, user_id: &str) -> Result<Option<CalendarCredential>>;

    async fn fetch_credentials_by_emails(&self, emails: &[String]) -> Result<Vec<CalendarCredential>>;

    async fn upsert_credential(&self, credential: &CalendarCredential) -> Result<()>;

    async fn update_access_token(&self, user_id: &str, access_token: &str) -> Result<()>;
}

/// Handles to every table, usually all backed by the same store.
#[derive(Clone)]
pub struct Stores {
    pub candidates: Arc<dyn CandidateStore>,
    pub audit: Arc<dyn AuditStore>,
    pub accounts: Arc<dyn AccountRoleStore>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: CandidateStore + AuditStore + AccountRoleStore + CredentialStore + 'static,
    {
        Self {
            candidates: backend.clone(),
            audit: backend.clone(),
            accounts: backend.clone(),
            credentials: backend,
        }
    }
}
