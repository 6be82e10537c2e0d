//! OTP record model - hashed one-time codes with expiry and attempt cap.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// OTP purpose codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Login,
    Register,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Login => "login",
            OtpPurpose::Register => "register",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Request metadata captured when a code is issued.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// OTP record. The plaintext code is never stored; `code_hash` is
/// `hex(sha256(code_salt || code))`.
#[derive(Debug, Clone, FromRow)]
pub struct OtpCode {
    pub otp_id: Uuid,
    pub identifier: String,
    pub purpose_code: String,
    pub code_salt: String,
    pub code_hash: String,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
    pub confirmed_utc: Option<DateTime<Utc>>,
    pub attempt_count: i32,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl OtpCode {
    /// Create a new OTP record.
    pub fn new(
        identifier: String,
        purpose: OtpPurpose,
        code_salt: String,
        code_hash: String,
        expiry_seconds: i64,
        meta: RequestMeta,
    ) -> Self {
        let now = Utc::now();
        Self {
            otp_id: Uuid::new_v4(),
            identifier,
            purpose_code: purpose.as_str().to_string(),
            code_salt,
            code_hash,
            expiry_utc: now + Duration::seconds(expiry_seconds),
            created_utc: now,
            confirmed_utc: None,
            attempt_count: 0,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
        }
    }

    /// Check if the record is still matchable (not expired, not confirmed).
    pub fn is_active(&self) -> bool {
        self.confirmed_utc.is_none() && self.expiry_utc > Utc::now()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_active_until_expiry() {
        let otp = OtpCode::new(
            "a@x.com".to_string(),
            OtpPurpose::Login,
            "salt".to_string(),
            "hash".to_string(),
            300,
            RequestMeta::default(),
        );
        assert!(otp.is_active());
        assert!(!otp.is_expired());
        assert_eq!(otp.attempt_count, 0);
        assert_eq!(otp.purpose_code, "login");
    }

    #[test]
    fn zero_expiry_record_is_expired() {
        let otp = OtpCode::new(
            "a@x.com".to_string(),
            OtpPurpose::PasswordReset,
            "salt".to_string(),
            "hash".to_string(),
            -1,
            RequestMeta::default(),
        );
        assert!(!otp.is_active());
    }
}
