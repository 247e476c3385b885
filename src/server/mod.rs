//! HTTP server for Storehouse

pub mod http;

pub use http::{run, AppState};
