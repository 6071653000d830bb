use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::account_role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccountPayload {
    #[validate(length(min = 1))]
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemoveAccountPayload {
    #[validate(length(min = 1))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub email: String,
    pub role: Role,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Id of the user whose stored calendar credential carries this email.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountListResponse {
    pub instructors: Vec<AccountSummary>,
    pub admins: Vec<AccountSummary>,
}
