pub mod account_service;
pub mod audit_service;
pub mod calendar_provider;
pub mod calendar_service;
pub mod candidate_service;
pub mod capacity_policy;
pub mod confirmation_service;
