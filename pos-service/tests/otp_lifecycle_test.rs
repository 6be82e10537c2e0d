//! OTP lifecycle integration tests: issuance, verification, attempt
//! caps, expiry, and most-recent-record selection.

mod common;

use common::TestApp;
use pos_core::error::AppError;
use pos_service::models::{OtpPurpose, RequestMeta};
use pos_service::services::otp::{OTP_ISSUE_LIMIT, OTP_MAX_ATTEMPTS};

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_generate_and_verify_roundtrip() {
    // Arrange
    let app = TestApp::spawn().await;
    let email = "otp-roundtrip@example.com";

    // Act
    let code = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    let verified = app
        .state
        .otp
        .verify(email, &code, OtpPurpose::Login)
        .await
        .expect("Verification errored");

    // Assert
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert!(verified);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_confirmed_code_cannot_be_reused() {
    let app = TestApp::spawn().await;
    let email = "otp-reuse@example.com";

    let code = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    let first = app
        .state
        .otp
        .verify(email, &code, OtpPurpose::Login)
        .await
        .expect("Verification errored");
    assert!(first);

    // The confirmed record is no longer active, so a second attempt
    // finds nothing and reports failure rather than an error.
    let second = app
        .state
        .otp
        .verify(email, &code, OtpPurpose::Login)
        .await
        .expect("Verification errored");
    assert!(!second);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_wrong_code_consumes_attempts_then_rate_limits() {
    let app = TestApp::spawn().await;
    let email = "otp-attempts@example.com";

    let code = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    // A wrong guess that still shares no digits with a real code.
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..OTP_MAX_ATTEMPTS {
        let verified = app
            .state
            .otp
            .verify(email, wrong, OtpPurpose::Login)
            .await
            .expect("Verification errored");
        assert!(!verified);
    }

    // The cap is exhausted: the next call deletes the record and
    // reports a rate-limit error even for the correct code.
    let result = app.state.otp.verify(email, &code, OtpPurpose::Login).await;
    assert!(matches!(result, Err(AppError::TooManyRequests(_, _))));

    // Record is gone, so further attempts just fail verification.
    let after = app
        .state
        .otp
        .verify(email, &code, OtpPurpose::Login)
        .await
        .expect("Verification errored");
    assert!(!after);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_most_recent_code_wins() {
    let app = TestApp::spawn().await;
    let email = "otp-recent@example.com";

    let first = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate first code");
    let second = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate second code");

    // Verification always targets the newest record; the older code
    // only matches if the two collide.
    if first != second {
        let verified = app
            .state
            .otp
            .verify(email, &first, OtpPurpose::Login)
            .await
            .expect("Verification errored");
        assert!(!verified);
    }

    let verified = app
        .state
        .otp
        .verify(email, &second, OtpPurpose::Login)
        .await
        .expect("Verification errored");
    assert!(verified);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_purposes_are_isolated() {
    let app = TestApp::spawn().await;
    let email = "otp-purpose@example.com";

    let code = app
        .state
        .otp
        .generate(email, OtpPurpose::PasswordReset, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    // A password reset code is not valid for login.
    let as_login = app
        .state
        .otp
        .verify(email, &code, OtpPurpose::Login)
        .await
        .expect("Verification errored");
    assert!(!as_login);

    let as_reset = app
        .state
        .otp
        .verify(email, &code, OtpPurpose::PasswordReset)
        .await
        .expect("Verification errored");
    assert!(as_reset);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_expired_code_is_rejected() {
    let app = TestApp::spawn().await;
    let email = "otp-expired@example.com";

    let code = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    // Force the record past its expiry.
    sqlx::query("UPDATE otp_codes SET expiry_utc = now() - interval '1 second' WHERE identifier = $1")
        .bind(email)
        .execute(app.state.db.pool())
        .await
        .expect("Failed to expire code");

    let verified = app
        .state
        .otp
        .verify(email, &code, OtpPurpose::Login)
        .await
        .expect("Verification errored");
    assert!(!verified);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_issuance_throttle() {
    let app = TestApp::spawn().await;
    let email = "otp-throttle@example.com";

    for _ in 0..OTP_ISSUE_LIMIT {
        app.state
            .otp
            .generate(email, OtpPurpose::Login, RequestMeta::default())
            .await
            .expect("Failed to generate code");
    }

    let result = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await;
    assert!(matches!(result, Err(AppError::TooManyRequests(_, _))));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_plaintext_code_is_never_stored() {
    let app = TestApp::spawn().await;
    let email = "otp-hash@example.com";

    let code = app
        .state
        .otp
        .generate(email, OtpPurpose::Login, RequestMeta::default())
        .await
        .expect("Failed to generate code");

    let (salt, hash): (String, String) =
        sqlx::query_as("SELECT code_salt, code_hash FROM otp_codes WHERE identifier = $1")
            .bind(email)
            .fetch_one(app.state.db.pool())
            .await
            .expect("Failed to read OTP record");

    assert_ne!(hash, code);
    assert!(!hash.contains(&code));
    assert_eq!(salt.len(), 32); // 16 random bytes, hex encoded
    assert_eq!(hash.len(), 64); // sha256, hex encoded
}
