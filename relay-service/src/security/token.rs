//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs binding a username (`sub`) with a fixed 7-day
//! validity window. There is no server-side session state and no revocation
//! list: a leaked token stays valid until it expires, regardless of logout.

use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_VALIDITY_DAYS: i64 = 7;

const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - the username
    pub sub: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiration time (unix timestamp)
    pub exp: i64,
}

/// Signs and verifies bearer tokens with the deployment secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `username` with the fixed validity window.
    pub fn issue(&self, username: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let expiry = now + Duration::days(TOKEN_VALIDITY_DAYS);

        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding)
            .map_err(|_| AppError::Internal)
    }

    /// Verify signature and expiry, returning the bound username.
    ///
    /// Every failure mode (bad signature, malformed token, expired) collapses
    /// into `Unauthorized` so callers cannot leak why verification failed.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(|_| AppError::Unauthorized)
    }
}
