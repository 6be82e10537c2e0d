//! Services layer: data access, OTP lifecycle, mail, tokens, onboarding.

mod database;
mod email;
mod jwt;
mod onboarding;
pub mod otp;

pub use database::Database;
pub use email::{LogMailer, Mailer, SmtpMailer};
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims, TokenResponse};
pub use onboarding::{InMemoryPermissionCache, OnboardingService, PermissionCache};
pub use otp::OtpService;
