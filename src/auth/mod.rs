pub mod resolver;
pub mod signature;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use resolver::{AuthError, AuthResolver, AuthStage, AuthUser};
pub use signature::{RequestSigner, SignatureError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Token introspection: turns a bearer token into the id of the user it was issued for
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn user_id(&self, token: &str) -> Result<String, TokenError>;
}

/// HS256 tokens signed with the configured JWT secret
#[derive(Clone)]
pub struct JwtTokens {
    secret: String,
    expiry_hours: u64,
}

impl JwtTokens {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours as i64)).timestamp(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    pub fn expires_in_secs(&self) -> u64 {
        self.expiry_hours * 3600
    }

    fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<Claims>(token, &decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

#[async_trait]
impl TokenResolver for JwtTokens {
    async fn user_id(&self, token: &str) -> Result<String, TokenError> {
        self.validate(token).map(|claims| claims.sub)
    }
}

/// bcrypt hash; runs on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> anyhow::Result<String> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// bcrypt verify; a malformed stored hash counts as a mismatch
pub async fn verify_password(password: String, hash: String) -> anyhow::Result<bool> {
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
    Ok(matched)
}
