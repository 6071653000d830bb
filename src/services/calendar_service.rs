use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::store::CredentialStore;
use crate::error::{CalendarError, Result};
use crate::models::actor::Actor;
use crate::models::calendar_credential::CalendarCredential;
use crate::models::calendar_event::CalendarEventRequest;
use crate::models::candidate::TimeSlot;
use crate::services::calendar_provider::CalendarProvider;
use crate::utils::time::{now, slot_window};

/// Mirrors confirmed slots into per-user external calendars.
#[derive(Clone)]
pub struct CalendarMirror {
    provider: Arc<dyn CalendarProvider>,
    credentials: Arc<dyn CredentialStore>,
    time_zone: Tz,
}

impl CalendarMirror {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        credentials: Arc<dyn CredentialStore>,
        time_zone: Tz,
    ) -> Self {
        Self {
            provider,
            credentials,
            time_zone,
        }
    }

    /// Loads the user's access token, refreshing it first when a refresh
    /// token is stored. A failed refresh falls back to the stored token.
    async fn access_token(&self, user_id: &str) -> Result<String> {
        let credential = self
            .credentials
            .fetch_credential(user_id)
            .await?
            .ok_or_else(|| CalendarError::MissingCredential(user_id.to_string()))?;

        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            return Ok(credential.access_token);
        };

        match self.provider.refresh_access_token(refresh_token).await {
            Ok(fresh) => {
                if let Err(e) = self.credentials.update_access_token(user_id, &fresh).await {
                    warn!(user_id, error = %e, "Failed to persist refreshed calendar token");
                }
                Ok(fresh)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Calendar token refresh failed, using stored token");
                Ok(credential.access_token)
            }
        }
    }

    pub async fn add_event(
        &self,
        user_id: &str,
        date: NaiveDate,
        time_slot: TimeSlot,
        title: &str,
        description: &str,
    ) -> Result<String> {
        let (start, end) = slot_window(date, time_slot, self.time_zone)?;
        let token = self.access_token(user_id).await?;
        let request = CalendarEventRequest {
            title: title.to_string(),
            description: description.to_string(),
            start,
            end,
            time_zone: self.time_zone.name().to_string(),
        };

        let event_id = self.provider.insert_event(&token, &request).await?;
        info!(user_id, event_id = %event_id, %date, slot = %time_slot, "Calendar event created");
        Ok(event_id)
    }

    /// Succeeds when the event is already gone on the provider side.
    pub async fn delete_event(&self, user_id: &str, event_id: &str) -> Result<()> {
        let token = self.access_token(user_id).await?;
        match self.provider.delete_event(&token, event_id).await {
            Ok(()) => {
                info!(user_id, event_id, "Calendar event deleted");
                Ok(())
            }
            Err(e) if e.is_gone() => {
                info!(user_id, event_id, "Calendar event was already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn event_exists(&self, user_id: &str, event_id: &str) -> Result<bool> {
        let token = self.access_token(user_id).await?;
        Ok(self.provider.event_exists(&token, event_id).await?)
    }

    /// Stores the actor's own token pair. A missing refresh token keeps the
    /// one already on file.
    pub async fn save_credential(
        &self,
        actor: &Actor,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<()> {
        let credential = CalendarCredential {
            user_id: actor.id.clone(),
            email: actor.email.to_lowercase(),
            access_token,
            refresh_token,
            updated_at: now(),
        };
        self.credentials.upsert_credential(&credential).await?;
        info!(user_id = %actor.id, "Calendar credential stored");
        Ok(())
    }
}
