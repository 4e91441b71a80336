//! Shape validation for key material crossing the wire.
//!
//! The relay stores public keys, nonces and ciphertext as opaque base64
//! strings. Encryption and decryption happen on the client; the server only
//! checks that what it persists has the right shape, so garbage is rejected
//! at the boundary instead of surfacing as a decryption failure later.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Byte length of an X25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Byte length of a message nonce.
pub const NONCE_LEN: usize = 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid base64 encoding")]
    InvalidEncoding,

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Validated public key (32 bytes, base64-encoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(String);

impl PublicKey {
    /// Validate a base64-encoded public key.
    pub fn parse(public_key: &str) -> Result<Self, SchemaError> {
        let decoded = STANDARD
            .decode(public_key)
            .map_err(|_| SchemaError::InvalidEncoding)?;

        if decoded.len() != PUBLIC_KEY_LEN {
            return Err(SchemaError::InvalidLength {
                expected: PUBLIC_KEY_LEN,
                actual: decoded.len(),
            });
        }

        Ok(Self(public_key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Validated message nonce (24 bytes, base64-encoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNonce(String);

impl MessageNonce {
    /// Validate a base64-encoded nonce.
    pub fn parse(nonce: &str) -> Result<Self, SchemaError> {
        let decoded = STANDARD
            .decode(nonce)
            .map_err(|_| SchemaError::InvalidEncoding)?;

        if decoded.len() != NONCE_LEN {
            return Err(SchemaError::InvalidLength {
                expected: NONCE_LEN,
                actual: decoded.len(),
            });
        }

        Ok(Self(nonce.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Check that ciphertext is valid base64 without constraining its length.
pub fn validate_ciphertext(content: &str) -> Result<(), SchemaError> {
    STANDARD
        .decode(content)
        .map_err(|_| SchemaError::InvalidEncoding)?;
    Ok(())
}
