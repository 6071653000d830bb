use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::database::store::AuditStore;
use crate::error::Result;
use crate::models::actor::Actor;
use crate::models::audit_log::AuditLogEntry;
use crate::models::candidate::Candidate;

/// Append-only confirmation history.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, entry: &AuditLogEntry) -> Result<()> {
        self.store.insert_audit_entry(entry).await
    }

    pub async fn record_confirmation(
        &self,
        actor: &Actor,
        candidate: &Candidate,
        at: DateTime<Utc>,
    ) -> Result<AuditLogEntry> {
        let entry = AuditLogEntry::confirmation(actor, candidate, at);
        self.record(&entry).await?;
        Ok(entry)
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<AuditLogEntry>> {
        self.store.fetch_audit_entries().await
    }
}
