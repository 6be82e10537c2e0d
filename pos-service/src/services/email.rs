use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    Message,
    SmtpTransport,
    Transport,
};
use pos_core::error::AppError;
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::models::OtpPurpose;

/// Delivery channel for one-time codes.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), AppError>;
}

fn subject_for(purpose: OtpPurpose) -> &'static str {
    match purpose {
        OtpPurpose::Login => "Your login code",
        OtpPurpose::Register => "Verify your email",
        OtpPurpose::PasswordReset => "Reset your password",
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP mailer initialized");

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), AppError> {
        let subject = subject_for(purpose);
        let body = format!(
            "Your one-time code is {}.\n\nIt expires in 5 minutes. If you didn't request this, please ignore this email.",
            code
        );

        let email = Message::builder()
            .from(self.from_address.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send in the blocking thread pool to avoid stalling the runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "OTP email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e.to_string(),
                    to = %to_email,
                    "Failed to send OTP email"
                );
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

/// Dev/test delivery channel: writes the code to the log instead of
/// sending mail, and never fails.
#[derive(Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), AppError> {
        // Dev-only channel: the log line IS the delivery
        tracing::info!(
            to = %to_email,
            code = %code,
            purpose = purpose.as_str(),
            "OTP (log delivery)"
        );
        Ok(())
    }
}
