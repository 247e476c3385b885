//! HTTP routes for Storehouse
//!
//! - `/register`, `/login` - identity endpoints (public)
//! - `/health` - liveness check (public)
//! - `/api/items/*` - inventory endpoints, gated by [`SessionGuard`]
//!
//! [`SessionGuard`]: crate::auth::SessionGuard

pub mod auth_routes;
pub mod health;
pub mod items;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::server::AppState;
use crate::types::StorehouseError;

pub use auth_routes::{handle_login, handle_register};
pub use health::health_check;

/// Response body type produced by every handler
pub type ResponseBody = Full<Bytes>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// JSON error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `{ "message": ... }` envelope
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn with_cors(mut response: Response<ResponseBody>) -> Response<ResponseBody> {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let json = match serde_json::to_vec(body) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            return error_response(&StorehouseError::Internal(e.to_string()));
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    with_cors(response)
}

/// Map an error to its status and client-safe message. Server-side detail
/// is logged, never returned.
pub fn error_response(err: &StorehouseError) -> Response<ResponseBody> {
    if err.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected: {}", err);
    }

    let body = serde_json::to_vec(&ErrorResponse {
        error: err.client_message(),
    })
    .unwrap_or_else(|_| br#"{"error":"internal server error"}"#.to_vec());

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = err.status_code();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    with_cors(response)
}

pub fn result_response<T: Serialize>(
    status: StatusCode,
    result: Result<T, StorehouseError>,
) -> Response<ResponseBody> {
    match result {
        Ok(body) => json_response(status, &body),
        Err(e) => error_response(&e),
    }
}

fn status_response(status: StatusCode, message: &str) -> Response<ResponseBody> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

pub fn not_found_response() -> Response<ResponseBody> {
    status_response(StatusCode::NOT_FOUND, "not found")
}

pub fn method_not_allowed_response() -> Response<ResponseBody> {
    status_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

pub fn cors_preflight() -> Response<ResponseBody> {
    let mut response = with_cors(Response::new(Full::new(Bytes::new())));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response.headers_mut().insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

/// Read and decode a JSON request body of at most [`MAX_BODY_BYTES`]
pub async fn parse_json_body<T, B>(req: Request<B>) -> Result<T, StorehouseError>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| StorehouseError::Validation(format!("failed to read body: {}", e)))?;

    serde_json::from_slice(&body.to_bytes())
        .map_err(|e| StorehouseError::Validation(format!("invalid request body: {}", e)))
}

fn auth_header<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Dispatch a request to its handler
pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("Routing {} {}", method, path);

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    match path.as_str() {
        "/register" => {
            return match method {
                Method::POST => handle_register(req, state).await,
                _ => method_not_allowed_response(),
            }
        }
        "/login" => {
            return match method {
                Method::POST => handle_login(req, state).await,
                _ => method_not_allowed_response(),
            }
        }
        "/health" | "/healthz" => {
            return match method {
                Method::GET => health_check(&state),
                _ => method_not_allowed_response(),
            }
        }
        _ => {}
    }

    if path == "/api" || path.starts_with("/api/") {
        let ctx = match state.guard.authenticate(auth_header(&req)) {
            Ok(ctx) => ctx,
            Err(e) => return error_response(&e),
        };
        debug!("Authenticated {} for {} {}", ctx.email, method, path);

        if let Some(rest) = path.strip_prefix("/api/items") {
            if rest.is_empty() || rest.starts_with('/') {
                return items::handle_items_request(req, state, rest).await;
            }
        }
    }

    not_found_response()
}
