use serde::{Deserialize, Serialize};

use crate::models::account_role::Role;

/// The signed-in user as handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::Instructor
        }
    }

    pub fn owns(&self, instructor_id: &str) -> bool {
        self.id == instructor_id
    }
}
