//! Current-user handlers.

use axum::extract::{Json, State};
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::SanitizedUser;
use crate::AppState;
use pos_core::error::AppError;

/// Fetch the authenticated user's own profile.
///
/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<SanitizedUser>, AppError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid token subject")))?;

    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(SanitizedUser::from(user)))
}
