use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::store::{
    AccountRoleStore, AuditStore, CandidateFilter, CandidateStore, CredentialStore,
};
use crate::error::{Error, Result};
use crate::models::account_role::{AccountRole, Role};
use crate::models::audit_log::{AuditLogEntry, AuditLogRow};
use crate::models::calendar_credential::CalendarCredential;
use crate::models::candidate::{Candidate, CandidateRow};

const CANDIDATE_COLUMNS: &str = "id, instructor_id, instructor_name, month, date, time_slot, memo, \
     status, submitted_at, confirmed_at, google_calendar_event_id, \
     admin_google_calendar_event_id, admin_calendar_user_id";

const AUDIT_COLUMNS: &str = "id, event_id, action, admin_id, admin_name, timestamp, event_date, \
     event_time_slot, instructor_id, instructor_name";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CandidateStore for PgStore {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()> {
        let row = CandidateRow::from(candidate);
        sqlx::query(
            r#"
            INSERT INTO session_candidates (
                id, instructor_id, instructor_name, month, date, time_slot, memo,
                status, submitted_at, confirmed_at, google_calendar_event_id,
                admin_google_calendar_event_id, admin_calendar_user_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.id)
        .bind(row.instructor_id)
        .bind(row.instructor_name)
        .bind(row.month)
        .bind(row.date)
        .bind(row.time_slot)
        .bind(row.memo)
        .bind(row.status)
        .bind(row.submitted_at)
        .bind(row.confirmed_at)
        .bind(row.google_calendar_event_id)
        .bind(row.admin_google_calendar_event_id)
        .bind(row.admin_calendar_user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {} FROM session_candidates WHERE id = $1",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Candidate::try_from).transpose()
    }

    async fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM session_candidates WHERE 1 = 1",
            CANDIDATE_COLUMNS
        ));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(instructor_id) = &filter.instructor_id {
            query.push(" AND instructor_id = ").push_bind(instructor_id.clone());
        }
        if let Some(month) = &filter.month {
            query.push(" AND month = ").push_bind(month.clone());
        }
        if let Some(date) = filter.date {
            query.push(" AND date = ").push_bind(date);
        }
        if let Some(time_slot) = filter.time_slot {
            query.push(" AND time_slot = ").push_bind(time_slot.as_str());
        }
        if filter.with_calendar_event {
            query.push(
                " AND (google_calendar_event_id IS NOT NULL OR admin_google_calendar_event_id IS NOT NULL)",
            );
        }
        query.push(" ORDER BY date ASC, submitted_at ASC");

        let rows = query
            .build_query_as::<CandidateRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Candidate::try_from).collect()
    }

    async fn update_candidate(&self, candidate: &Candidate) -> Result<bool> {
        let row = CandidateRow::from(candidate);
        let result = sqlx::query(
            r#"
            UPDATE session_candidates
            SET instructor_id = $2,
                instructor_name = $3,
                month = $4,
                date = $5,
                time_slot = $6,
                memo = $7,
                status = $8,
                submitted_at = $9,
                confirmed_at = $10,
                google_calendar_event_id = $11,
                admin_google_calendar_event_id = $12,
                admin_calendar_user_id = $13
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(row.instructor_id)
        .bind(row.instructor_name)
        .bind(row.month)
        .bind(row.date)
        .bind(row.time_slot)
        .bind(row.memo)
        .bind(row.status)
        .bind(row.submitted_at)
        .bind(row.confirmed_at)
        .bind(row.google_calendar_event_id)
        .bind(row.admin_google_calendar_event_id)
        .bind(row.admin_calendar_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM session_candidates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        let row = AuditLogRow::from(entry);
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, event_id, action, admin_id, admin_name, timestamp,
                event_date, event_time_slot, instructor_id, instructor_name
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(row.id)
        .bind(row.event_id)
        .bind(row.action)
        .bind(row.admin_id)
        .bind(row.admin_name)
        .bind(row.timestamp)
        .bind(row.event_date)
        .bind(row.event_time_slot)
        .bind(row.instructor_id)
        .bind(row.instructor_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_audit_entries(&self) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(&format!(
            "SELECT {} FROM audit_logs ORDER BY timestamp DESC",
            AUDIT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}

type AccountRoleRecord = (String, String, DateTime<Utc>);

fn account_role_from_record((email, role, created_at): AccountRoleRecord) -> Result<AccountRole> {
    let role = role
        .parse::<Role>()
        .map_err(|_| Error::Internal(format!("Account {} has unknown role '{}'", email, role)))?;
    Ok(AccountRole {
        email,
        role,
        created_at,
    })
}

#[async_trait]
impl AccountRoleStore for PgStore {
    async fn fetch_account_roles(&self) -> Result<Vec<AccountRole>> {
        let rows = sqlx::query_as::<_, AccountRoleRecord>(
            "SELECT email, role, created_at FROM account_roles ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(account_role_from_record).collect()
    }

    async fn find_account_role(&self, email: &str) -> Result<Option<AccountRole>> {
        let row = sqlx::query_as::<_, AccountRoleRecord>(
            "SELECT email, role, created_at FROM account_roles WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(account_role_from_record).transpose()
    }

    async fn insert_account_role(&self, role: &AccountRole) -> Result<()> {
        sqlx::query("INSERT INTO account_roles (email, role, created_at) VALUES ($1, $2, $3)")
            .bind(&role.email)
            .bind(role.role.as_str())
            .bind(role.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_account_role(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM account_roles WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn fetch_credential(&self, user_id: &str) -> Result<Option<CalendarCredential>> {
        let row = sqlx::query_as::<_, CalendarCredential>(
            "SELECT user_id, email, access_token, refresh_token, updated_at FROM user_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn fetch_credentials_by_emails(&self, emails: &[String]) -> Result<Vec<CalendarCredential>> {
        let rows = sqlx::query_as::<_, CalendarCredential>(
            "SELECT user_id, email, access_token, refresh_token, updated_at FROM user_tokens WHERE lower(email) = ANY($1)",
        )
        .bind(emails)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_credential(&self, credential: &CalendarCredential) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, email, access_token, refresh_token, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
            SET email = EXCLUDED.email,
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, user_tokens.refresh_token),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&credential.user_id)
        .bind(&credential.email)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_access_token(&self, user_id: &str, access_token: &str) -> Result<()> {
        sqlx::query("UPDATE user_tokens SET access_token = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(access_token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
