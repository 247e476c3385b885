//! Authentication for Storehouse
//!
//! Provides:
//! - Password hashing with Argon2
//! - Session token issuance and validation
//! - The bearer-token request gate
//! - Registration and login orchestration

pub mod guard;
pub mod identity;
pub mod jwt;
pub mod password;

pub use guard::{extract_bearer_token, AuthContext, SessionGuard, BEARER_PREFIX};
pub use identity::{
    is_valid_email, normalize_email, CredentialPolicy, IdentityService, LoginOutcome,
};
pub use jwt::{IssuedToken, SessionClaims, SessionCodec, DEFAULT_SESSION_TTL_SECONDS};
pub use password::{CredentialHasher, HasherConfig};
