#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use consultation_scheduler::database::{
    CandidateFilter, CandidateStore, CredentialStore, MemoryStore, Stores,
};
use consultation_scheduler::error::{CalendarError, Error, Result as StoreResult};
use consultation_scheduler::models::actor::Actor;
use consultation_scheduler::models::calendar_credential::CalendarCredential;
use consultation_scheduler::models::calendar_event::CalendarEventRequest;
use consultation_scheduler::models::candidate::{Candidate, TimeSlot};
use consultation_scheduler::services::calendar_provider::CalendarProvider;
use consultation_scheduler::AppState;

#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub token: String,
    pub title: String,
    pub start: String,
}

#[derive(Default)]
struct CalendarState {
    next_id: u32,
    events: HashMap<String, StoredEvent>,
    failing_tokens: HashSet<String>,
    insert_calls: usize,
    delete_calls: usize,
}

/// In-memory calendar keyed by access token. Tokens listed with
/// `fail_for` get an API error on every call.
#[derive(Default, Clone)]
pub struct FakeCalendar {
    state: Arc<Mutex<CalendarState>>,
}

impl FakeCalendar {
    pub fn fail_for(&self, token: &str) {
        self.state.lock().unwrap().failing_tokens.insert(token.to_string());
    }

    /// Simulates someone deleting the event directly in their calendar app.
    pub fn remove_externally(&self, event_id: &str) {
        self.state.lock().unwrap().events.remove(event_id);
    }

    pub fn event(&self, event_id: &str) -> Option<StoredEvent> {
        self.state.lock().unwrap().events.get(event_id).cloned()
    }

    pub fn events_for(&self, token: &str) -> Vec<StoredEvent> {
        self.state
            .lock()
            .unwrap()
            .events
            .values()
            .filter(|e| e.token == token)
            .cloned()
            .collect()
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.state.lock().unwrap().delete_calls
    }

    fn check(&self, token: &str) -> Result<(), CalendarError> {
        if self.state.lock().unwrap().failing_tokens.contains(token) {
            return Err(CalendarError::Api {
                status: 503,
                message: "calendar backend unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &CalendarEventRequest,
    ) -> Result<String, CalendarError> {
        self.state.lock().unwrap().insert_calls += 1;
        self.check(access_token)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("evt-{}", state.next_id);
        state.events.insert(
            id.clone(),
            StoredEvent {
                token: access_token.to_string(),
                title: event.title.clone(),
                start: event.start.to_rfc3339(),
            },
        );
        Ok(id)
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError> {
        self.state.lock().unwrap().delete_calls += 1;
        self.check(access_token)?;
        match self.state.lock().unwrap().events.remove(event_id) {
            Some(_) => Ok(()),
            None => Err(CalendarError::NotFound),
        }
    }

    async fn event_exists(&self, access_token: &str, event_id: &str) -> Result<bool, CalendarError> {
        self.check(access_token)?;
        Ok(self.state.lock().unwrap().events.contains_key(event_id))
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<String, CalendarError> {
        Err(CalendarError::Unauthorized("refresh not supported".into()))
    }
}

pub const JWT_SECRET: &str = "test_secret_key";

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub calendar: FakeCalendar,
}

pub fn harness() -> Harness {
    harness_with_stores(|_, stores| stores)
}

/// Like `harness`, but lets a test swap individual table handles. The
/// closure gets the shared `MemoryStore` so wrappers can delegate to it.
pub fn harness_with_stores(
    customize: impl FnOnce(Arc<MemoryStore>, Stores) -> Stores,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let calendar = FakeCalendar::default();
    let stores = customize(store.clone(), Stores::from_backend(store.clone()));
    let state = AppState::from_parts(
        stores,
        Arc::new(calendar.clone()),
        chrono_tz::Asia::Tokyo,
        vec!["root@example.com".to_string()],
        JWT_SECRET.to_string(),
    );
    Harness {
        state,
        store,
        calendar,
    }
}

/// Candidate table over `MemoryStore` whose updates fail on demand.
#[derive(Clone)]
pub struct FlakyCandidates {
    inner: Arc<MemoryStore>,
    /// Candidate id to the number of updates still allowed before failing.
    allowed_updates: Arc<Mutex<HashMap<Uuid, usize>>>,
}

impl FlakyCandidates {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            allowed_updates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lets `allowed` more updates of `id` through, then fails every one after.
    pub fn fail_updates_after(&self, id: Uuid, allowed: usize) {
        self.allowed_updates.lock().unwrap().insert(id, allowed);
    }
}

#[async_trait]
impl CandidateStore for FlakyCandidates {
    async fn insert_candidate(&self, candidate: &Candidate) -> StoreResult<()> {
        self.inner.insert_candidate(candidate).await
    }

    async fn fetch_candidate(&self, id: Uuid) -> StoreResult<Option<Candidate>> {
        self.inner.fetch_candidate(id).await
    }

    async fn fetch_candidates(&self, filter: &CandidateFilter) -> StoreResult<Vec<Candidate>> {
        self.inner.fetch_candidates(filter).await
    }

    async fn update_candidate(&self, candidate: &Candidate) -> StoreResult<bool> {
        {
            let mut allowed = self.allowed_updates.lock().unwrap();
            if let Some(remaining) = allowed.get_mut(&candidate.id) {
                if *remaining == 0 {
                    return Err(Error::Internal("candidate table unavailable".into()));
                }
                *remaining -= 1;
            }
        }
        self.inner.update_candidate(candidate).await
    }

    async fn delete_candidate(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_candidate(id).await
    }
}

pub fn token_for(user_id: &str) -> String {
    format!("token-{}", user_id)
}

impl Harness {
    /// Gives `user_id` a calendar credential whose access token is `token-<user_id>`.
    pub async fn link_calendar(&self, user_id: &str) {
        self.store
            .upsert_credential(&CalendarCredential {
                user_id: user_id.to_string(),
                email: format!("{}@example.com", user_id),
                access_token: token_for(user_id),
                refresh_token: None,
                updated_at: Utc::now(),
            })
            .await
            .expect("store credential");
    }
}

pub fn instructor(id: &str) -> Actor {
    Actor {
        id: id.to_string(),
        name: format!("Instructor {}", id),
        email: format!("{}@example.com", id),
        is_admin: false,
    }
}

pub fn admin() -> Actor {
    Actor {
        id: "admin-1".to_string(),
        name: "Operations".to_string(),
        email: "ops@example.com".to_string(),
        is_admin: true,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn submission(
    date: NaiveDate,
    time_slot: TimeSlot,
) -> consultation_scheduler::dto::candidate_dto::CreateCandidatePayload {
    consultation_scheduler::dto::candidate_dto::CreateCandidatePayload {
        instructor_id: None,
        instructor_name: None,
        date,
        time_slot,
        memo: None,
    }
}
