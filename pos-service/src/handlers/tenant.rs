//! Tenant onboarding and lookup handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateTenantRequest, TenantResponse};
use crate::scope::Principal;
use crate::AppState;
use pos_core::error::AppError;

/// Onboard a new tenant. Restricted to system-level principals.
///
/// POST /tenants
#[tracing::instrument(skip(state, req), fields(tenant_slug = %req.tenant_slug))]
pub async fn create_tenant(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<TenantResponse>), AppError> {
    if !principal.is_system() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only system-level users can onboard tenants"
        )));
    }
    req.validate()?;

    let tenant = state.onboarding.onboard_tenant(req).await?;
    Ok((StatusCode::CREATED, Json(TenantResponse::from(tenant))))
}

/// Fetch a tenant. Tenant principals can only see their own tenant.
///
/// GET /tenants/:tenant_id
pub async fn get_tenant(
    State(state): State<AppState>,
    principal: Principal,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<TenantResponse>, AppError> {
    if let Some(own_tenant) = principal.tenant_id {
        if own_tenant != tenant_id {
            return Err(AppError::NotFound(anyhow::anyhow!("Tenant not found")));
        }
    }

    let tenant = state
        .db
        .find_tenant_by_id(tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tenant not found")))?;

    Ok(Json(TenantResponse::from(tenant)))
}
