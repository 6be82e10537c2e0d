//! User model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scope::TenantOwned;

/// User state codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Active,
    Disabled,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Active => "active",
            UserState::Disabled => "disabled",
        }
    }
}

/// User entity. A NULL `tenant_id` denotes a system-level user with
/// cross-tenant visibility.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub display_name: String,
    pub email_verified: bool,
    pub user_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new user. `password_hash` is None for OTP-only accounts.
    pub fn new(
        tenant_id: Option<Uuid>,
        email: String,
        password_hash: Option<String>,
        display_name: String,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            tenant_id,
            email,
            password_hash,
            display_name,
            email_verified: false,
            user_state_code: UserState::Active.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.user_state_code == UserState::Active.as_str()
    }
}

impl TenantOwned for User {
    fn tenant_id_mut(&mut self) -> &mut Option<Uuid> {
        &mut self.tenant_id
    }
}

/// User representation safe to return to clients.
#[derive(Debug, Serialize)]
pub struct SanitizedUser {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub display_name: String,
    pub email_verified: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            tenant_id: u.tenant_id,
            email: u.email,
            display_name: u.display_name,
            email_verified: u.email_verified,
            created_utc: u.created_utc,
        }
    }
}
