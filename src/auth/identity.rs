//! Registration and login
//!
//! Hashing runs on the blocking pool so argon2's deliberate cost never
//! stalls the async workers.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::jwt::{IssuedToken, SessionCodec};
use super::password::CredentialHasher;
use crate::db::{PersistentStore, StoreError};
use crate::types::{PublicUser, StorehouseError, User};

/// Default minimum password length
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 8;

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_PART_LEN: usize = 64;

/// Credential policy constants
#[derive(Debug, Clone, Copy)]
pub struct CredentialPolicy {
    pub min_password_len: usize,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

/// Successful login result
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: u64,
    pub user: PublicUser,
}

/// Trim and lower-case an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural email check: one `@`, a plausible local part, and a dotted
/// domain made of alphanumeric/hyphen labels.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > MAX_LOCAL_PART_LEN || domain.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Orchestrates registration and login
pub struct IdentityService {
    store: Arc<dyn PersistentStore>,
    codec: Arc<SessionCodec>,
    hasher: Arc<CredentialHasher>,
    policy: CredentialPolicy,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        codec: Arc<SessionCodec>,
        hasher: Arc<CredentialHasher>,
        policy: CredentialPolicy,
    ) -> Self {
        Self {
            store,
            codec,
            hasher,
            policy,
        }
    }

    /// Create an account and return its id
    pub async fn register(&self, email: &str, password: &str) -> Result<Uuid, StorehouseError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(StorehouseError::Validation("invalid email address".into()));
        }
        if password.chars().count() < self.policy.min_password_len {
            return Err(StorehouseError::Validation(format!(
                "password must be at least {} characters",
                self.policy.min_password_len
            )));
        }

        // Fast path; the store's uniqueness constraint is the real guard
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(StorehouseError::Conflict("user already exists".into()));
        }

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

        let user = match self.store.insert_user(User::new(email, password_hash)).await {
            Ok(user) => user,
            Err(StoreError::DuplicateKey(_)) => {
                return Err(StorehouseError::Conflict("user already exists".into()))
            }
            Err(e) => return Err(e.into()),
        };

        info!("Registered new user: {}", user.email);
        Ok(user.id)
    }

    /// Verify credentials and issue a session token.
    ///
    /// Unknown accounts and wrong passwords fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, StorehouseError> {
        let email = normalize_email(email);
        let user = self.store.find_user_by_email(&email).await?;

        let hasher = Arc::clone(&self.hasher);
        let candidate = password.to_string();
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&candidate, &hash),
            None => hasher.verify_against_dummy(&candidate),
        })
        .await??;

        let user = match user {
            Some(user) if verified => user,
            Some(_) => {
                warn!("Login failed - invalid password: {}", email);
                return Err(StorehouseError::Unauthorized);
            }
            None => {
                warn!("Login failed - user not found: {}", email);
                return Err(StorehouseError::Unauthorized);
            }
        };

        let IssuedToken { token, expires_at } = self.codec.issue(&user)?;

        info!("Login successful: {}", user.email);
        Ok(LoginOutcome {
            token,
            expires_at,
            user: user.to_public(),
        })
    }
}
