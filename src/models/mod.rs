pub mod account_role;
pub mod actor;
pub mod audit_log;
pub mod calendar_credential;
pub mod calendar_event;
pub mod candidate;
