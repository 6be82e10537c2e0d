//! Principal construction middleware.
//!
//! Builds the request-scoped `Principal` from the validated token claims
//! and places it in request extensions, so handlers and the data-access
//! layer receive it explicitly instead of reading ambient state.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use pos_core::error::AppError;
use uuid::Uuid;

use crate::scope::Principal;
use crate::services::AccessTokenClaims;

/// Should be applied after `auth_middleware`: it reads the claims from
/// request extensions and derives the principal for downstream handlers.
pub async fn principal_middleware(mut request: Request, next: Next) -> Response {
    let principal = request
        .extensions()
        .get::<AccessTokenClaims>()
        .and_then(|claims| {
            let user_id = Uuid::parse_str(&claims.sub).ok()?;
            let tenant_id = match &claims.tenant_id {
                Some(raw) => Some(Uuid::parse_str(raw).ok()?),
                None => None,
            };
            Some(Principal { user_id, tenant_id })
        });

    if let Some(principal) = principal {
        request.extensions_mut().insert(principal);
    }

    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Principal not found")))
    }
}
