pub mod account_dto;
pub mod calendar_dto;
pub mod candidate_dto;
