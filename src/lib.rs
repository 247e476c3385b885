//! Storehouse - inventory API with governed restocks
//!
//! Authenticated clients manage stock items and record restock events.
//!
//! ## Services
//!
//! - **Identity**: argon2 credential hashing, registration and login
//! - **Sessions**: stateless HS256 session tokens and the bearer gate
//! - **Inventory**: item CRUD over a pluggable persistent store
//! - **Restock governance**: sliding-window cap plus an append-only ledger

pub mod auth;
pub mod config;
pub mod db;
pub mod inventory;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, StorehouseError};
