//! Health check endpoint
//!
//! `/health` and `/healthz` return 200 whenever the process is serving.

use chrono::Utc;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, ResponseBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// Service version
    pub version: &'static str,
    /// Active store backend
    pub store: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    /// Operating mode
    pub mode: &'static str,
}

pub fn health_check(state: &AppState) -> Response<ResponseBody> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.backend_name(),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
    };

    json_response(StatusCode::OK, &response)
}
