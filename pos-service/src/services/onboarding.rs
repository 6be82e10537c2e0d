//! Tenant onboarding: create the tenant and clone template roles into it
//! inside one transaction, then drop the permission cache.

use async_trait::async_trait;
use dashmap::DashMap;
use pos_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{CreateTenantRequest, Role, Tenant};
use crate::services::Database;

/// Cached role-permission lookups. The registrar cache is an external
/// collaborator of onboarding: bulk role creation must invalidate it.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    async fn cached_permissions(&self, role_id: Uuid) -> Option<Vec<String>>;
    async fn cache_permissions(&self, role_id: Uuid, permissions: Vec<String>);
    async fn forget_cached_permissions(&self);
}

/// In-process cache backed by a DashMap.
#[derive(Default)]
pub struct InMemoryPermissionCache {
    inner: DashMap<Uuid, Vec<String>>,
}

impl InMemoryPermissionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn cached_permissions(&self, role_id: Uuid) -> Option<Vec<String>> {
        self.inner.get(&role_id).map(|entry| entry.clone())
    }

    async fn cache_permissions(&self, role_id: Uuid, permissions: Vec<String>) {
        self.inner.insert(role_id, permissions);
    }

    async fn forget_cached_permissions(&self) {
        self.inner.clear();
    }
}

#[derive(Clone)]
pub struct OnboardingService {
    db: Database,
    permission_cache: Arc<dyn PermissionCache>,
}

impl OnboardingService {
    pub fn new(db: Database, permission_cache: Arc<dyn PermissionCache>) -> Self {
        Self {
            db,
            permission_cache,
        }
    }

    /// Onboard a new tenant. The tenant row and the cloned template
    /// roles commit atomically.
    #[tracing::instrument(skip(self, req), fields(slug = %req.tenant_slug))]
    pub async fn onboard_tenant(&self, req: CreateTenantRequest) -> Result<Tenant, AppError> {
        if self
            .db
            .find_tenant_by_slug(&req.tenant_slug)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Tenant slug already in use"
            )));
        }

        let tenant = Tenant::new(req.tenant_slug, req.tenant_label);
        let templates = self.db.list_template_roles().await?;

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        sqlx::query(
            r#"
            INSERT INTO tenants (tenant_id, tenant_slug, tenant_label, tenant_state_code, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(tenant.tenant_id)
        .bind(&tenant.tenant_slug)
        .bind(&tenant.tenant_label)
        .bind(&tenant.tenant_state_code)
        .bind(tenant.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        for template in &templates {
            let clone = Role::new(
                Some(tenant.tenant_id),
                template.role_label.clone(),
                template.permissions.clone(),
            );
            sqlx::query(
                r#"
                INSERT INTO roles (role_id, tenant_id, scope_code, role_label, permissions, created_utc)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(clone.role_id)
            .bind(clone.tenant_id)
            .bind(&clone.scope_code)
            .bind(&clone.role_label)
            .bind(&clone.permissions)
            .bind(clone.created_utc)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        self.permission_cache.forget_cached_permissions().await;

        tracing::info!(
            tenant_id = %tenant.tenant_id,
            cloned_roles = templates.len(),
            "Tenant onboarded"
        );

        Ok(tenant)
    }
}
