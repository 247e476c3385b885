//! Session token handling
//!
//! Issues and validates the signed, self-contained tokens that prove a
//! prior successful login.
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - Default expiry is 24 hours, with zero clock leeway
//! - Sessions are stateless: there is no revocation list, so a leaked token
//!   stays valid until `exp`
//! - In production, JWT_SECRET must be a strong random value from environment

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{StorehouseError, User};

/// Minimum accepted signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Default session lifetime: 24 hours
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Longest accepted session lifetime: one year
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Signing secret used when dev mode runs without JWT_SECRET
const DEV_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Payload stored in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity id
    pub sub: Uuid,
    /// Identity email at login time
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Not valid before (Unix timestamp)
    pub nbf: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly issued token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Session token issuer and validator
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Create a new codec
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: &str, ttl_seconds: u64) -> Result<Self, StorehouseError> {
        if secret.is_empty() {
            return Err(StorehouseError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(StorehouseError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        if ttl_seconds == 0 || ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(StorehouseError::Config(format!(
                "Session TTL must be between 1 and {} seconds",
                MAX_SESSION_TTL_SECONDS
            )));
        }

        Ok(Self::from_secret(secret, ttl_seconds))
    }

    /// Create a codec for dev mode, signed with a well-known insecure secret
    pub fn new_dev(ttl_seconds: u64) -> Self {
        Self::from_secret(DEV_SECRET, ttl_seconds.clamp(1, MAX_SESSION_TTL_SECONDS))
    }

    fn from_secret(secret: &str, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
        }
    }

    /// Issue a session token for a user, valid from now
    pub fn issue(&self, user: &User) -> Result<IssuedToken, StorehouseError> {
        self.issue_at(user, get_current_timestamp())
    }

    /// Issue a session token with an explicit issue time
    pub fn issue_at(&self, user: &User, now: u64) -> Result<IssuedToken, StorehouseError> {
        let exp = now
            .checked_add(self.ttl_seconds)
            .ok_or_else(|| StorehouseError::Internal("Token expiry out of range".into()))?;
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            iat: now,
            nbf: now,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| StorehouseError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify and decode a session token
    ///
    /// The signature is checked before any claim is read, then `nbf` and
    /// `exp` are checked against the current time.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, StorehouseError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::ImmatureSignature => "Token not yet valid",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                        "Invalid token"
                    }
                    _ => "Token validation failed",
                };
                StorehouseError::Unauthenticated(reason.into())
            })
    }
}
