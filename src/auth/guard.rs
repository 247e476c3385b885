//! Request gate for protected routes
//!
//! Every `/api/*` request passes through [`SessionGuard::authenticate`]
//! before its handler runs. On success the handler receives an
//! [`AuthContext`]; on any failure the request is rejected as
//! unauthenticated.

use std::sync::Arc;

use uuid::Uuid;

use super::jwt::SessionCodec;
use crate::types::StorehouseError;

/// Scheme prefix required on the Authorization header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Identity resolved from a valid session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub identity_id: Uuid,
    pub email: String,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The length is checked before the prefix comparison so a header shorter
/// than the prefix (e.g. `"Bear"`) is rejected instead of sliced.
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, StorehouseError> {
    let header = header
        .ok_or_else(|| StorehouseError::Unauthenticated("authorization header is required".into()))?;

    if header.len() < BEARER_PREFIX.len() {
        return Err(StorehouseError::Unauthenticated(
            "bearer token missing".into(),
        ));
    }

    match header.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix == BEARER_PREFIX => {}
        _ => {
            return Err(StorehouseError::Unauthenticated(
                "bearer token missing".into(),
            ))
        }
    }

    let token = header[BEARER_PREFIX.len()..].trim();
    if token.is_empty() {
        return Err(StorehouseError::Unauthenticated(
            "bearer token missing".into(),
        ));
    }

    Ok(token)
}

/// Validates bearer tokens at the request boundary
#[derive(Debug, Clone)]
pub struct SessionGuard {
    codec: Arc<SessionCodec>,
}

impl SessionGuard {
    pub fn new(codec: Arc<SessionCodec>) -> Self {
        Self { codec }
    }

    /// Resolve the caller's identity from the raw Authorization header value
    pub fn authenticate(&self, header: Option<&str>) -> Result<AuthContext, StorehouseError> {
        let token = extract_bearer_token(header)?;

        let claims = self
            .codec
            .validate(token)
            .map_err(|_| StorehouseError::Unauthenticated("invalid or expired token".into()))?;

        Ok(AuthContext {
            identity_id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::DEFAULT_SESSION_TTL_SECONDS;
    use crate::types::User;
    use jsonwebtoken::get_current_timestamp;

    fn guard() -> (SessionGuard, Arc<SessionCodec>) {
        let codec = Arc::new(
            SessionCodec::new(
                "test-secret-that-is-at-least-32-characters-long",
                DEFAULT_SESSION_TTL_SECONDS,
            )
            .unwrap(),
        );
        (SessionGuard::new(Arc::clone(&codec)), codec)
    }

    fn assert_unauthenticated(result: Result<AuthContext, StorehouseError>) {
        assert!(matches!(result, Err(StorehouseError::Unauthenticated(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc123")).unwrap(), "abc123");

        assert!(extract_bearer_token(None).is_err());
        assert!(extract_bearer_token(Some("")).is_err());
        assert!(extract_bearer_token(Some("Bearer ")).is_err());
        assert!(extract_bearer_token(Some("Bearer    ")).is_err());
        assert!(extract_bearer_token(Some("Basic abc123")).is_err());
        assert!(extract_bearer_token(Some("bearer abc123")).is_err());
        assert!(extract_bearer_token(Some("abc123")).is_err());
    }

    #[test]
    fn test_header_shorter_than_prefix() {
        let (guard, _) = guard();
        assert_unauthenticated(guard.authenticate(Some("Bear")));
        assert_unauthenticated(guard.authenticate(Some("B")));
        // Multi-byte characters must not cause a slicing fault either
        assert_unauthenticated(guard.authenticate(Some("Beäre")));
        assert_unauthenticated(guard.authenticate(Some("ééééééé")));
    }

    #[test]
    fn test_missing_header() {
        let (guard, _) = guard();
        let err = guard.authenticate(None).unwrap_err();
        assert_eq!(err.client_message(), "authorization header is required");
    }

    #[test]
    fn test_valid_token_resolves_identity() {
        let (guard, codec) = guard();
        let user = User::new("guard@example.com".into(), "hash".into());
        let issued = codec.issue(&user).unwrap();

        let ctx = guard
            .authenticate(Some(&format!("Bearer {}", issued.token)))
            .unwrap();
        assert_eq!(ctx.identity_id, user.id);
        assert_eq!(ctx.email, "guard@example.com");
    }

    #[test]
    fn test_expired_token_rejected() {
        let (guard, codec) = guard();
        let user = User::new("guard@example.com".into(), "hash".into());
        let issued = codec
            .issue_at(&user, get_current_timestamp() - 3 * DEFAULT_SESSION_TTL_SECONDS)
            .unwrap();

        let err = guard
            .authenticate(Some(&format!("Bearer {}", issued.token)))
            .unwrap_err();
        assert_eq!(err.client_message(), "invalid or expired token");
    }

    #[test]
    fn test_garbage_token_rejected() {
        let (guard, _) = guard();
        assert_unauthenticated(guard.authenticate(Some("Bearer not.a.token")));
    }
}
