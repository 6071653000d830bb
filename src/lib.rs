pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::database::{PgStore, Stores};
use crate::services::{
    account_service::AccountService,
    audit_service::AuditService,
    calendar_provider::{CalendarProvider, GoogleCalendarProvider},
    calendar_service::CalendarMirror,
    candidate_service::CandidateService,
    confirmation_service::ConfirmationService,
};
use chrono_tz::Tz;
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub candidate_service: CandidateService,
    pub confirmation_service: ConfirmationService,
    pub audit_service: AuditService,
    pub account_service: AccountService,
    pub calendar_mirror: CalendarMirror,
    pub jwt_secret: Arc<String>,
}

impl AppState {
    pub fn new(pool: PgPool) -> error::Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let stores = Stores::from_backend(Arc::new(PgStore::new(pool)));
        let provider = Arc::new(GoogleCalendarProvider::from_config(http_client));

        Ok(Self::from_parts(
            stores,
            provider,
            config.calendar_time_zone,
            config.admin_emails.clone(),
            config.jwt_secret.clone(),
        ))
    }

    /// Wires services over explicit collaborators. Used by `new` and by tests.
    pub fn from_parts(
        stores: Stores,
        provider: Arc<dyn CalendarProvider>,
        time_zone: Tz,
        admin_emails: Vec<String>,
        jwt_secret: String,
    ) -> Self {
        let calendar_mirror = CalendarMirror::new(provider, stores.credentials.clone(), time_zone);
        let audit_service = AuditService::new(stores.audit.clone());
        let candidate_service = CandidateService::new(stores.candidates.clone());
        let confirmation_service = ConfirmationService::new(
            stores.candidates.clone(),
            audit_service.clone(),
            calendar_mirror.clone(),
        );
        let account_service = AccountService::new(
            stores.accounts.clone(),
            stores.credentials.clone(),
            admin_emails,
        );

        Self {
            stores,
            candidate_service,
            confirmation_service,
            audit_service,
            account_service,
            calendar_mirror,
            jwt_secret: Arc::new(jwt_secret),
        }
    }
}
