//! External calendar capability and its Google Calendar implementation.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::models::calendar_event::CalendarEventRequest;

/// Raw calendar operations, keyed by an access token and opaque event ids.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Creates an event and returns its id.
    async fn insert_event(
        &self,
        access_token: &str,
        event: &CalendarEventRequest,
    ) -> Result<String, CalendarError>;

    /// Fails with `CalendarError::NotFound` when the event is already gone.
    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError>;

    /// `Ok(false)` when the provider reports the event as missing.
    async fn event_exists(&self, access_token: &str, event_id: &str) -> Result<bool, CalendarError>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, CalendarError>;
}

#[derive(Clone)]
pub struct GoogleCalendarProvider {
    client: Client,
    api_base: String,
    token_url: String,
    calendar_id: String,
    client_id: String,
    client_secret: String,
}

impl GoogleCalendarProvider {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
        calendar_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            calendar_id: calendar_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn from_config(client: Client) -> Self {
        let config = crate::config::get_config();
        Self::new(
            client,
            config.calendar_api_base.clone(),
            config.oauth_token_url.clone(),
            config.calendar_id.clone(),
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
        )
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.api_base, self.calendar_id)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), event_id)
    }
}

#[derive(Debug, Serialize)]
struct GoogleEventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: GoogleEventTime,
    end: GoogleEventTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Deserialize)]
struct GoogleEventCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenRefreshResponse {
    access_token: String,
}

async fn into_calendar_error(response: Response) -> CalendarError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => CalendarError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CalendarError::Unauthorized(message),
        _ => CalendarError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &CalendarEventRequest,
    ) -> Result<String, CalendarError> {
        let body = GoogleEventBody {
            summary: &event.title,
            description: &event.description,
            start: GoogleEventTime {
                date_time: event.start.to_rfc3339(),
                time_zone: event.time_zone.clone(),
            },
            end: GoogleEventTime {
                date_time: event.end.to_rfc3339(),
                time_zone: event.time_zone.clone(),
            },
        };

        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_calendar_error(response).await);
        }

        let created: GoogleEventCreated = response.json().await?;
        Ok(created.id)
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError> {
        let response = self
            .client
            .delete(self.event_url(event_id))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_calendar_error(response).await);
        }
        Ok(())
    }

    async fn event_exists(&self, access_token: &str, event_id: &str) -> Result<bool, CalendarError> {
        let response = self
            .client
            .get(self.event_url(event_id))
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(true);
        }
        match into_calendar_error(response).await {
            CalendarError::NotFound => Ok(false),
            other => Err(other),
        }
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, CalendarError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CalendarError::Unauthorized(format!(
                "token refresh failed ({}): {}",
                status, message
            )));
        }

        let refreshed: GoogleTokenRefreshResponse = response.json().await?;
        Ok(refreshed.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::candidate::TimeSlot;
    use crate::utils::time::slot_window;

    fn provider(server: &MockServer) -> GoogleCalendarProvider {
        GoogleCalendarProvider::new(
            Client::new(),
            server.uri(),
            format!("{}/token", server.uri()),
            "primary",
            "client-id",
            "client-secret",
        )
    }

    fn request() -> CalendarEventRequest {
        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let (start, end) = slot_window(date, TimeSlot::SlotB, chrono_tz::Asia::Tokyo).unwrap();
        CalendarEventRequest {
            title: "Group Consultation".into(),
            description: "Instructor: Sato".into(),
            start,
            end,
            time_zone: "Asia/Tokyo".into(),
        }
    }

    #[tokio::test]
    async fn insert_posts_event_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer token-1"))
            .and(body_string_contains("2026-02-01T00:00:00+09:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "evt-42" })))
            .expect(1)
            .mount(&server)
            .await;

        let id = provider(&server).insert_event("token-1", &request()).await.unwrap();
        assert_eq!(id, "evt-42");
    }

    #[tokio::test]
    async fn delete_of_a_gone_event_reports_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt-1"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let err = provider(&server).delete_event("t", "evt-1").await.unwrap_err();
        assert!(err.is_gone());
    }

    #[tokio::test]
    async fn existence_probe_distinguishes_missing_from_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/present"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "present" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/denied"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert!(provider.event_exists("t", "present").await.unwrap());
        assert!(!provider.event_exists("t", "missing").await.unwrap());
        assert!(matches!(
            provider.event_exists("t", "denied").await,
            Err(CalendarError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn refresh_exchanges_refresh_token_for_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "fresh", "expires_in": 3600 })),
            )
            .mount(&server)
            .await;

        let token = provider(&server).refresh_access_token("r-1").await.unwrap();
        assert_eq!(token, "fresh");
    }
}
