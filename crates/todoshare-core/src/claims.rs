use serde::{Deserialize, Serialize};

use crate::model::UserId;
use crate::role::Role;

/// The authenticated caller, decoded once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl Claims {
    pub fn new(user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
