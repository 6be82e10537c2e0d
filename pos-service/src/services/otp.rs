//! OTP lifecycle: issue, deliver, verify.
//!
//! Codes are hashed at rest so a database read does not leak valid
//! codes; attempts are capped to bound brute-force guessing within the
//! short validity window; the most recent record wins when a user
//! requests several codes in quick succession.

use pos_core::error::AppError;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::models::{OtpCode, OtpPurpose, RequestMeta};
use crate::services::{Database, Mailer};

/// Policy constants, not configurable per call.
pub const OTP_LENGTH: usize = 6;
pub const OTP_EXPIRY_SECONDS: i64 = 300;
pub const OTP_MAX_ATTEMPTS: i32 = 3;

/// Issuance throttle: codes per identifier+purpose per window.
pub const OTP_ISSUE_LIMIT: i64 = 3;
pub const OTP_ISSUE_WINDOW_SECONDS: i64 = 15 * 60;

#[derive(Clone)]
pub struct OtpService {
    db: Database,
    mailer: Arc<dyn Mailer>,
}

impl OtpService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Issue a new code. Returns the plaintext exactly once; only the
    /// salted hash is stored. Outstanding earlier codes stay valid.
    #[tracing::instrument(skip(self, meta), fields(purpose = purpose.as_str()))]
    pub async fn generate(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
        meta: RequestMeta,
    ) -> Result<String, AppError> {
        let recent = self
            .db
            .count_recent_otps(identifier, purpose, OTP_ISSUE_WINDOW_SECONDS)
            .await?;
        if recent >= OTP_ISSUE_LIMIT {
            return Err(AppError::TooManyRequests(
                "Too many codes requested. Please try again later.".to_string(),
                Some(OTP_ISSUE_WINDOW_SECONDS as u64),
            ));
        }

        let code = generate_code();
        let salt = generate_salt();
        let hash = hash_code(&salt, &code);

        let record = OtpCode::new(
            identifier.to_string(),
            purpose,
            salt,
            hash,
            OTP_EXPIRY_SECONDS,
            meta,
        );
        self.db.insert_otp_code(&record).await?;

        tracing::info!(otp_id = %record.otp_id, "OTP issued");
        Ok(code)
    }

    /// Deliver a code over the configured channel. Send failures from
    /// the SMTP mailer propagate; the dev log mailer never fails.
    pub async fn deliver(
        &self,
        identifier: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), AppError> {
        self.mailer.send_otp(identifier, code, purpose).await
    }

    /// Verify a code against the most recent active record.
    ///
    /// Returns Ok(false) when there is no matching record or the code is
    /// wrong (an attempt is consumed). Returns a rate-limit error and
    /// deletes the record when the attempt cap is exhausted.
    #[tracing::instrument(skip(self, code), fields(purpose = purpose.as_str()))]
    pub async fn verify(
        &self,
        identifier: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<bool, AppError> {
        let Some(record) = self.db.find_latest_active_otp(identifier, purpose).await? else {
            return Ok(false);
        };

        if record.attempt_count >= OTP_MAX_ATTEMPTS {
            self.db.delete_otp(record.otp_id).await?;
            tracing::warn!(otp_id = %record.otp_id, "OTP attempt limit reached, record deleted");
            return Err(AppError::TooManyRequests(
                "Too many failed attempts. Request a new code.".to_string(),
                None,
            ));
        }

        if hashes_match(&record.code_hash, &hash_code(&record.code_salt, code)) {
            self.db.confirm_otp(record.otp_id).await?;
            tracing::info!(otp_id = %record.otp_id, "OTP confirmed");
            return Ok(true);
        }

        // Single conditional update: concurrent wrong guesses cannot
        // both observe a counter below the cap.
        let incremented = self
            .db
            .increment_otp_attempts_below(record.otp_id, OTP_MAX_ATTEMPTS)
            .await?;
        if !incremented {
            self.db.delete_otp(record.otp_id).await?;
            return Err(AppError::TooManyRequests(
                "Too many failed attempts. Request a new code.".to_string(),
                None,
            ));
        }

        Ok(false)
    }
}

/// Generate a zero-padded numeric code, uniform over the full code space.
fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_LENGTH)
}

/// Random 16-byte hex salt, stored alongside the hash.
fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// One-way salted hash of a code for storage.
fn hash_code(salt: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of two hex digests.
fn hashes_match(stored: &str, supplied: &str) -> bool {
    stored.as_bytes().ct_eq(supplied.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digit_zero_padded() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn hash_is_stable_and_never_the_plaintext() {
        let salt = generate_salt();
        let hash = hash_code(&salt, "045213");
        assert_ne!(hash, "045213");
        assert_eq!(hash, hash_code(&salt, "045213"));
    }

    #[test]
    fn different_salts_produce_different_hashes() {
        let a = hash_code("aaaa", "045213");
        let b = hash_code("bbbb", "045213");
        assert_ne!(a, b);
    }

    #[test]
    fn hashes_match_requires_exact_digest() {
        let salt = generate_salt();
        let hash = hash_code(&salt, "123456");
        assert!(hashes_match(&hash, &hash_code(&salt, "123456")));
        assert!(!hashes_match(&hash, &hash_code(&salt, "123457")));
    }
}
