//! HTTP Routes for Authentication
//!
//! - POST /register - Create an account
//! - POST /login    - Authenticate and get a session token

use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{error_response, json_response, parse_json_body, ResponseBody};
use crate::server::AppState;
use crate::types::{PublicUser, StorehouseError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    fn require_fields(&self) -> Result<(), StorehouseError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(StorehouseError::Validation(
                "email and password are required".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: u64,
    pub user: PublicUser,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /register
pub async fn handle_register<B>(req: Request<B>, state: Arc<AppState>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = body.require_fields() {
        return error_response(&e);
    }

    match state.identity.register(&body.email, &body.password).await {
        Ok(user_id) => json_response(
            StatusCode::CREATED,
            &RegisterResponse {
                message: "user registered successfully",
                user_id,
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /login
pub async fn handle_login<B>(req: Request<B>, state: Arc<AppState>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = body.require_fields() {
        return error_response(&e);
    }

    match state.identity.login(&body.email, &body.password).await {
        Ok(outcome) => json_response(
            StatusCode::OK,
            &LoginResponse {
                token: outcome.token,
                expires_at: outcome.expires_at,
                user: outcome.user,
            },
        ),
        Err(e) => error_response(&e),
    }
}
