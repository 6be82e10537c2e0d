//! Authentication handlers.
//!
//! Implements OTP request/verify flows for:
//! - Passwordless login
//! - Registration email confirmation
//! - Password reset
//!
//! plus account registration and refresh-token rotation.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Json, State},
    http::{header, HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{OtpPurpose, RequestMeta, SanitizedUser, User};
use crate::services::{otp::OTP_EXPIRY_SECONDS, TokenResponse};
use crate::utils::password::{hash_password, Password};
use crate::AppState;
use pos_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request to register a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    /// Optional: accounts without one authenticate via OTP only.
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    /// Slug of the tenant to join; absent for system-level accounts.
    pub tenant_slug: Option<String>,
}

/// Request to send an OTP.
#[derive(Debug, Deserialize, Validate)]
pub struct RequestOtpRequest {
    #[validate(email)]
    pub email: String,
    pub purpose: OtpPurpose,
}

/// Response after sending an OTP.
#[derive(Debug, Serialize)]
pub struct RequestOtpResponse {
    pub expires_in: i64, // seconds
}

/// Request to verify an OTP.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 6))]
    pub code: String,
    pub purpose: OtpPurpose,
}

/// Response after verifying an OTP for login.
#[derive(Debug, Serialize)]
pub struct VerifyOtpLoginResponse {
    pub user_id: uuid::Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Response after verifying an OTP for registration confirmation.
#[derive(Debug, Serialize)]
pub struct VerifyOtpVerifyResponse {
    pub verified: bool,
    pub purpose: String,
}

/// Generic verify response that can be either type.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum VerifyOtpResponse {
    Login(VerifyOtpLoginResponse),
    Verify(VerifyOtpVerifyResponse),
}

/// Request to start a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

/// Request to complete a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetConfirmRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 6))]
    pub code: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Request to rotate a refresh token.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new account.
///
/// POST /auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SanitizedUser>), AppError> {
    req.validate()?;

    if state.db.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "An account with this email already exists"
        )));
    }

    let tenant_id = match &req.tenant_slug {
        Some(slug) => {
            let tenant = state
                .db
                .find_tenant_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tenant not found")))?;
            if !tenant.is_active() {
                return Err(AppError::Forbidden(anyhow::anyhow!("Tenant is not active")));
            }
            Some(tenant.tenant_id)
        }
        None => None,
    };

    let password_hash = match &req.password {
        Some(raw) => Some(
            hash_password(&Password::new(raw.clone()))
                .map_err(AppError::InternalError)?
                .into_string(),
        ),
        None => None,
    };

    let user = User::new(tenant_id, req.email.clone(), password_hash, req.display_name);
    // Registration runs before any token exists, so there is no
    // principal; the tenant resolved from the slug is stored as-is.
    let user = state.db.insert_user(user, None).await?;

    // Confirmation code; delivery failure surfaces to the caller so the
    // client can retry the request.
    let meta = request_meta(&headers, addr);
    let code = state
        .otp
        .generate(&user.email, OtpPurpose::Register, meta)
        .await?;
    state
        .otp
        .deliver(&user.email, &code, OtpPurpose::Register)
        .await?;

    tracing::info!(user_id = %user.user_id, "user registered");
    Ok((StatusCode::CREATED, Json(SanitizedUser::from(user))))
}

/// Send an OTP to the given email address.
///
/// POST /auth/otp/request
#[tracing::instrument(skip(state, req), fields(purpose = req.purpose.as_str()))]
pub async fn request_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>, AppError> {
    req.validate()?;

    // Login and password reset require an existing account; registration
    // confirmation is requested before the account is usable.
    if matches!(req.purpose, OtpPurpose::Login | OtpPurpose::PasswordReset) {
        let user = state
            .db
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
        if !user.is_active() {
            return Err(AppError::Forbidden(anyhow::anyhow!("Account is not active")));
        }
    }

    let meta = request_meta(&headers, addr);
    let code = state.otp.generate(&req.email, req.purpose, meta).await?;
    state.otp.deliver(&req.email, &code, req.purpose).await?;

    Ok(Json(RequestOtpResponse {
        expires_in: OTP_EXPIRY_SECONDS,
    }))
}

/// Verify an OTP code.
///
/// POST /auth/otp/verify
#[tracing::instrument(skip(state, req), fields(purpose = req.purpose.as_str()))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    req.validate()?;

    if req.purpose == OtpPurpose::PasswordReset {
        // The reset code is consumed together with the new password.
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Use the password reset confirmation endpoint"
        )));
    }

    let verified = state.otp.verify(&req.email, &req.code, req.purpose).await?;
    if !verified {
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Invalid or expired code. Please try again."
        )));
    }

    match req.purpose {
        OtpPurpose::Login => {
            let user = state
                .db
                .find_user_by_email(&req.email)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

            let tokens = state
                .jwt
                .generate_token_pair(&user)
                .map_err(AppError::InternalError)?;

            Ok(Json(VerifyOtpResponse::Login(VerifyOtpLoginResponse {
                user_id: user.user_id,
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                token_type: tokens.token_type,
                expires_in: tokens.expires_in,
            })))
        }
        OtpPurpose::Register => {
            if let Some(user) = state.db.find_user_by_email(&req.email).await? {
                state.db.mark_email_verified(user.user_id).await?;
            }
            Ok(Json(VerifyOtpResponse::Verify(VerifyOtpVerifyResponse {
                verified: true,
                purpose: OtpPurpose::Register.as_str().to_string(),
            })))
        }
        OtpPurpose::PasswordReset => unreachable!("rejected above"),
    }
}

/// Start a password reset.
///
/// POST /auth/password-reset/request
#[tracing::instrument(skip(state, req))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<RequestOtpResponse>, AppError> {
    req.validate()?;

    let user = state
        .db
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let meta = request_meta(&headers, addr);
    let code = state
        .otp
        .generate(&user.email, OtpPurpose::PasswordReset, meta)
        .await?;
    state
        .otp
        .deliver(&user.email, &code, OtpPurpose::PasswordReset)
        .await?;

    Ok(Json(RequestOtpResponse {
        expires_in: OTP_EXPIRY_SECONDS,
    }))
}

/// Complete a password reset: the code and the new password travel
/// together, so a verified code cannot be replayed for a second change.
///
/// POST /auth/password-reset/confirm
#[tracing::instrument(skip(state, req))]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    let verified = state
        .otp
        .verify(&req.email, &req.code, OtpPurpose::PasswordReset)
        .await?;
    if !verified {
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Invalid or expired code. Please try again."
        )));
    }

    let user = state
        .db
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let password_hash = hash_password(&Password::new(req.new_password))
        .map_err(AppError::InternalError)?;
    state
        .db
        .update_password(user.user_id, password_hash.as_str())
        .await?;

    tracing::info!(user_id = %user.user_id, "password reset completed");
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

/// Rotate a refresh token into a new token pair.
///
/// POST /auth/refresh
#[tracing::instrument(skip(state, req))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let claims = state
        .jwt
        .validate_refresh_token(&req.refresh_token)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid or expired refresh token")))?;

    let user_id = uuid::Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid token subject")))?;
    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("User not found")))?;
    if !user.is_active() {
        return Err(AppError::Forbidden(anyhow::anyhow!("Account is not active")));
    }

    let tokens = state
        .jwt
        .generate_token_pair(&user)
        .map_err(AppError::InternalError)?;
    Ok(Json(tokens))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Capture client metadata for the audit columns on OTP records.
fn request_meta(headers: &HeaderMap, addr: SocketAddr) -> RequestMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| Some(addr.ip().to_string()));

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    RequestMeta {
        ip_address,
        user_agent,
    }
}
