use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::database::store::{AccountRoleStore, CredentialStore};
use crate::dto::account_dto::{AccountListResponse, AccountSummary};
use crate::error::{Error, Result};
use crate::models::account_role::{AccountRole, Role};
use crate::models::actor::Actor;
use crate::utils::time::now;
use crate::utils::validation::normalize_email;

/// Email to role mapping that decides who is an admin.
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountRoleStore>,
    credentials: Arc<dyn CredentialStore>,
    configured_admins: Arc<Vec<String>>,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRoleStore>,
        credentials: Arc<dyn CredentialStore>,
        configured_admins: Vec<String>,
    ) -> Self {
        Self {
            accounts,
            credentials,
            configured_admins: Arc::new(configured_admins),
        }
    }

    pub async fn list(&self) -> Result<AccountListResponse> {
        let roles = self.accounts.fetch_account_roles().await?;
        let emails: Vec<String> = roles.iter().map(|r| r.email.to_lowercase()).collect();
        let user_ids: HashMap<String, String> = if emails.is_empty() {
            HashMap::new()
        } else {
            self.credentials
                .fetch_credentials_by_emails(&emails)
                .await?
                .into_iter()
                .map(|c| (c.email.to_lowercase(), c.user_id))
                .collect()
        };

        let mut response = AccountListResponse {
            instructors: Vec::new(),
            admins: Vec::new(),
        };
        for role in roles {
            let summary = AccountSummary {
                user_id: user_ids.get(&role.email.to_lowercase()).cloned(),
                email: role.email,
                role: role.role,
                created_at: role.created_at,
            };
            match summary.role {
                Role::Instructor => response.instructors.push(summary),
                Role::Admin => response.admins.push(summary),
            }
        }
        Ok(response)
    }

    pub async fn add(&self, email: &str, role: Role) -> Result<AccountRole> {
        let email = normalize_email(email)?;
        if self.accounts.find_account_role(&email).await?.is_some() {
            return Err(Error::BadRequest(format!("{} is already registered", email)));
        }
        let account = AccountRole {
            email,
            role,
            created_at: now(),
        };
        self.accounts
            .insert_account_role(&account)
            .await
            .map_err(|e| match e {
                Error::Conflict(_) => {
                    Error::BadRequest(format!("{} is already registered", account.email))
                }
                other => other,
            })?;
        info!(email = %account.email, role = %account.role, "Account role added");
        Ok(account)
    }

    /// An admin cannot drop their own admin role.
    pub async fn remove(&self, actor: &Actor, email: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(Error::BadRequest("Email address is required".to_string()));
        }
        if actor.email.to_lowercase() == email {
            let own = self.accounts.find_account_role(&email).await?;
            if own.map(|r| r.role) == Some(Role::Admin) {
                return Err(Error::BadRequest(
                    "You cannot remove your own admin role".to_string(),
                ));
            }
        }
        let removed = self.accounts.delete_account_role(&email).await?;
        if removed {
            info!(email = %email, actor_id = %actor.id, "Account role removed");
        }
        Ok(removed)
    }

    /// Configured admin emails plus admin rows in the store.
    pub async fn is_admin_email(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        if self.configured_admins.iter().any(|admin| *admin == email) {
            return Ok(true);
        }
        Ok(self
            .accounts
            .find_account_role(&email)
            .await?
            .map_or(false, |r| r.role == Role::Admin))
    }
}
