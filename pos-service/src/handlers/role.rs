//! Role handlers.
//!
//! Reads are tenant-filtered: a tenant principal sees its own roles plus
//! the unowned templates; a system principal sees everything.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateRoleRequest, Role, RoleResponse};
use crate::scope::Principal;
use crate::AppState;
use pos_core::error::AppError;

/// List roles visible to the caller.
///
/// GET /roles
pub async fn list_roles(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<RoleResponse>>, AppError> {
    let roles = state.db.list_roles(Some(&principal)).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

/// Fetch a single role visible to the caller.
///
/// GET /roles/:role_id
pub async fn get_role(
    State(state): State<AppState>,
    principal: Principal,
    Path(role_id): Path<Uuid>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = state
        .db
        .find_role_by_id(role_id, Some(&principal))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Role not found")))?;
    Ok(Json(RoleResponse::from(role)))
}

/// Create a role. Tenant principals always create within their own
/// tenant regardless of the tenant_id in the body; system principals
/// may pass None to create a template role.
///
/// POST /roles
#[tracing::instrument(skip(state, req), fields(role_label = %req.role_label))]
pub async fn create_role(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), AppError> {
    req.validate()?;

    let role = Role::new(req.tenant_id, req.role_label, req.permissions);
    let role = state.db.insert_role(role, Some(&principal)).await?;
    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

/// Delete a role owned by the caller's tenant. Template roles cannot be
/// deleted by tenant principals.
///
/// DELETE /roles/:role_id
#[tracing::instrument(skip(state))]
pub async fn delete_role(
    State(state): State<AppState>,
    principal: Principal,
    Path(role_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_role(role_id, Some(&principal)).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Role not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
