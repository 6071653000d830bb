//! In-process store used by tests and local runs without Postgres.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::store::{
    AccountRoleStore, AuditStore, CandidateFilter, CandidateStore, CredentialStore,
};
use crate::error::{Error, Result};
use crate::models::account_role::AccountRole;
use crate::models::audit_log::AuditLogEntry;
use crate::models::calendar_credential::CalendarCredential;
use crate::models::candidate::Candidate;

#[derive(Default)]
struct Tables {
    candidates: Vec<Candidate>,
    audit_logs: Vec<AuditLogEntry>,
    account_roles: Vec<AccountRole>,
    credentials: HashMap<String, CalendarCredential>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.candidates.iter().any(|c| c.id == candidate.id) {
            return Err(Error::Conflict(format!(
                "Candidate {} already exists",
                candidate.id
            )));
        }
        tables.candidates.push(candidate.clone());
        Ok(())
    }

    async fn fetch_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Candidate> = tables
            .candidates
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        });
        Ok(rows)
    }

    async fn update_candidate(&self, candidate: &Candidate) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.candidates.iter_mut().find(|c| c.id == candidate.id) {
            Some(stored) => {
                *stored = candidate.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.candidates.len();
        tables.candidates.retain(|c| c.id != id);
        Ok(tables.candidates.len() < before)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        self.tables.write().await.audit_logs.push(entry.clone());
        Ok(())
    }

    async fn fetch_audit_entries(&self) -> Result<Vec<AuditLogEntry>> {
        let tables = self.tables.read().await;
        let mut entries = tables.audit_logs.clone();
        // Reversed first so the stable sort puts later inserts ahead on equal timestamps.
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}

#[async_trait]
impl AccountRoleStore for MemoryStore {
    async fn fetch_account_roles(&self) -> Result<Vec<AccountRole>> {
        let tables = self.tables.read().await;
        let mut roles = tables.account_roles.clone();
        roles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(roles)
    }

    async fn find_account_role(&self, email: &str) -> Result<Option<AccountRole>> {
        let tables = self.tables.read().await;
        Ok(tables
            .account_roles
            .iter()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn insert_account_role(&self, role: &AccountRole) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.account_roles.iter().any(|r| r.email == role.email) {
            return Err(Error::Conflict(format!(
                "Account {} already exists",
                role.email
            )));
        }
        tables.account_roles.push(role.clone());
        Ok(())
    }

    async fn delete_account_role(&self, email: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.account_roles.len();
        tables.account_roles.retain(|r| r.email != email);
        Ok(tables.account_roles.len() < before)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn fetch_credential(&self, user_id: &str) -> Result<Option<CalendarCredential>> {
        Ok(self.tables.read().await.credentials.get(user_id).cloned())
    }

    async fn fetch_credentials_by_emails(&self, emails: &[String]) -> Result<Vec<CalendarCredential>> {
        let tables = self.tables.read().await;
        Ok(tables
            .credentials
            .values()
            .filter(|c| emails.contains(&c.email.to_lowercase()))
            .cloned()
            .collect())
    }

    async fn upsert_credential(&self, credential: &CalendarCredential) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mut stored = credential.clone();
        if stored.refresh_token.is_none() {
            stored.refresh_token = tables
                .credentials
                .get(&credential.user_id)
                .and_then(|existing| existing.refresh_token.clone());
        }
        tables.credentials.insert(stored.user_id.clone(), stored);
        Ok(())
    }

    async fn update_access_token(&self, user_id: &str, access_token: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(credential) = tables.credentials.get_mut(user_id) {
            credential.access_token = access_token.to_string();
            credential.updated_at = Utc::now();
        }
        Ok(())
    }
}
