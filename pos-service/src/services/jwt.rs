use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::User;

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// `token_use` value stamped into access tokens.
const TOKEN_USE_ACCESS: &str = "access";
/// `token_use` value stamped into refresh tokens.
const TOKEN_USE_REFRESH: &str = "refresh";

/// Claims for access tokens (short-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Tenant ID; absent for system-level users
    pub tenant_id: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Token kind discriminator, always "access"
    pub token_use: String,
}

/// Claims for refresh tokens (long-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    /// Token kind discriminator, always "refresh"
    pub token_use: String,
}

/// Token response returned to clients
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    /// Create a new JWT service by loading RSA keys from files
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let private_key_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read private key from {}: {}",
                config.private_key_path,
                e
            )
        })?;

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;

        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        tracing::info!("JWT service initialized with RS256 keys");

        Ok(Self {
            encoding_key,
            decoding_key,
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        })
    }

    /// Generate an access/refresh pair for a user
    pub fn generate_token_pair(&self, user: &User) -> Result<TokenResponse, anyhow::Error> {
        let now = Utc::now();

        let access_exp = now + Duration::minutes(self.access_token_expiry_minutes);
        let access_claims = AccessTokenClaims {
            sub: user.user_id.to_string(),
            email: user.email.clone(),
            tenant_id: user.tenant_id.map(|t| t.to_string()),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_use: TOKEN_USE_ACCESS.to_string(),
        };

        let refresh_exp = now + Duration::days(self.refresh_token_expiry_days);
        let refresh_claims = RefreshTokenClaims {
            sub: user.user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: refresh_exp.timestamp(),
            iat: now.timestamp(),
            token_use: TOKEN_USE_REFRESH.to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        let access_token = encode(&header, &access_claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;
        let refresh_token = encode(&header, &refresh_claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry_minutes * 60,
        })
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<AccessTokenClaims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::RS256);
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        if data.claims.token_use != TOKEN_USE_ACCESS {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
        }
        Ok(data.claims)
    }

    /// Validate a refresh token and return its claims. The `token_use`
    /// check stops an access token from being replayed here, since both
    /// token kinds are signed with the same key.
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenClaims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::RS256);
        let data = decode::<RefreshTokenClaims>(token, &self.decoding_key, &validation)?;
        if data.claims.token_use != TOKEN_USE_REFRESH {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
        }
        Ok(data.claims)
    }
}
