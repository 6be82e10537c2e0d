//! Role model - the scoped entity of the tenant access filter.
//!
//! A role with a NULL `tenant_id` is a template visible to every tenant;
//! tenant onboarding clones templates into the new tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::scope::{TenantOwned, SCOPE_TENANT};

/// Role entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub scope_code: String,
    pub role_label: String,
    pub permissions: Vec<String>,
    pub created_utc: DateTime<Utc>,
}

impl Role {
    /// Create a new tenant-scope role. `tenant_id` of None makes a template.
    pub fn new(tenant_id: Option<Uuid>, role_label: String, permissions: Vec<String>) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            tenant_id,
            scope_code: SCOPE_TENANT.to_string(),
            role_label,
            permissions,
            created_utc: Utc::now(),
        }
    }

    /// A template role is visible to all tenants.
    pub fn is_template(&self) -> bool {
        self.tenant_id.is_none()
    }
}

impl TenantOwned for Role {
    fn tenant_id_mut(&mut self) -> &mut Option<Uuid> {
        &mut self.tenant_id
    }
}

/// Request to create a role.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    /// Ignored for tenant principals: the stored row is always stamped
    /// with the caller's tenant.
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub role_label: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Role response for API.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub scope_code: String,
    pub role_label: String,
    pub permissions: Vec<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Role> for RoleResponse {
    fn from(r: Role) -> Self {
        Self {
            role_id: r.role_id,
            tenant_id: r.tenant_id,
            scope_code: r.scope_code,
            role_label: r.role_label,
            permissions: r.permissions,
            created_utc: r.created_utc,
        }
    }
}
