pub mod memory;
pub mod pool;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    AccountRoleStore, AuditStore, CandidateFilter, CandidateStore, CredentialStore, Stores,
};
