//! Tenant records. Every scoped row in the system hangs off one of these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle state stored in `tenant_state_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantState {
    Active,
    Suspended,
}

impl TenantState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantState::Active => "active",
            TenantState::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for TenantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub tenant_label: String,
    pub tenant_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl Tenant {
    /// Build a fresh, active tenant ready for insertion.
    pub fn new(tenant_slug: String, tenant_label: String) -> Self {
        Self {
            tenant_id: Uuid::new_v4(),
            tenant_slug,
            tenant_label,
            tenant_state_code: TenantState::Active.to_string(),
            created_utc: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.tenant_state_code == TenantState::Active.as_str()
    }

    pub fn is_suspended(&self) -> bool {
        self.tenant_state_code == TenantState::Suspended.as_str()
    }
}

/// Payload for the tenant onboarding endpoint. The slug doubles as the
/// stable handle users supply during registration.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 2, max = 64))]
    pub tenant_slug: String,
    #[validate(length(min = 1, max = 128))]
    pub tenant_label: String,
}

/// Wire shape returned by tenant endpoints.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub tenant_label: String,
    pub tenant_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        let Tenant {
            tenant_id,
            tenant_slug,
            tenant_label,
            tenant_state_code,
            created_utc,
        } = tenant;
        Self {
            tenant_id,
            tenant_slug,
            tenant_label,
            tenant_state_code,
            created_utc,
        }
    }
}
