//! Error types for Storehouse

use hyper::StatusCode;

use crate::db::StoreError;

/// Main error type for Storehouse operations
#[derive(Debug, thiserror::Error)]
pub enum StorehouseError {
    /// Malformed input, rejected before any side effect
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing, malformed, or expired session proof
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Bad login credentials. Carries no detail so that an unknown
    /// account and a wrong password look identical.
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorehouseError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client.
    ///
    /// Server-side failures collapse to a generic message; their detail
    /// only goes to the log.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::Unauthenticated(msg)
            | Self::Conflict(msg)
            | Self::NotFound(msg)
            | Self::RateLimited(msg) => msg.clone(),
            Self::Unauthorized => "invalid credentials".to_string(),
            Self::Store(_) | Self::Internal(_) | Self::Config(_) => {
                "internal server error".to_string()
            }
        }
    }

    /// Whether this error represents a server-side fault
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<StoreError> for StorehouseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::DuplicateKey(what) => Self::Conflict(what),
            StoreError::QuantityOverflow => Self::Validation("quantity overflow".into()),
            StoreError::Backend(detail) => Self::Store(detail),
        }
    }
}

impl From<std::io::Error> for StorehouseError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorehouseError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Background task failed: {}", err))
    }
}

/// Result type alias for Storehouse operations
pub type Result<T> = std::result::Result<T, StorehouseError>;
