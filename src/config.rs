//! Configuration for Storehouse
//!
//! CLI arguments and environment variable handling using clap.

use chrono::Duration;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

use crate::auth::jwt::{MAX_SESSION_TTL_SECONDS, MIN_SECRET_LEN};
use crate::auth::CredentialPolicy;
use crate::inventory::{RestockPolicy, MAX_RESTOCK_WINDOW_SECONDS};

/// Persistence backend selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local maps; data is lost on restart
    Memory,
    /// MongoDB collections
    Mongo,
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Storehouse - inventory API with rate-limited restocking
#[derive(Parser, Debug, Clone)]
#[command(name = "storehouse")]
#[command(about = "Inventory API with session auth and restock governance")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (insecure signing secret allowed, mongo optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Persistence backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value = "memory")]
    pub store_backend: StoreBackend,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "storehouse")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Session token lifetime in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "86400")]
    pub session_ttl_seconds: u64,

    /// Minimum password length for registration
    #[arg(long, env = "MIN_PASSWORD_LENGTH", default_value = "8")]
    pub min_password_length: usize,

    /// Smallest accepted restock amount
    #[arg(long, env = "RESTOCK_MIN_AMOUNT", default_value = "10")]
    pub restock_min_amount: i64,

    /// Largest accepted restock amount
    #[arg(long, env = "RESTOCK_MAX_AMOUNT", default_value = "1000")]
    pub restock_max_amount: i64,

    /// Restock rate-limit window in seconds
    #[arg(long, env = "RESTOCK_WINDOW_SECONDS", default_value = "86400")]
    pub restock_window_seconds: i64,

    /// Restocks allowed per item per window
    #[arg(long, env = "RESTOCK_MAX_PER_WINDOW", default_value = "3")]
    pub restock_max_per_window: u64,

    /// Items at or below this quantity are listed as low stock
    #[arg(long, env = "LOW_STOCK_THRESHOLD", default_value = "20")]
    pub low_stock_threshold: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Args {
    /// Configured signing secret, if any
    pub fn signing_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Restock limits from config. An out-of-range window is clamped here
    /// and rejected by [`Args::validate`].
    pub fn restock_policy(&self) -> RestockPolicy {
        let window_seconds = self
            .restock_window_seconds
            .clamp(0, MAX_RESTOCK_WINDOW_SECONDS + 1);
        RestockPolicy {
            min_amount: self.restock_min_amount,
            max_amount: self.restock_max_amount,
            window: Duration::seconds(window_seconds),
            max_per_window: self.restock_max_per_window,
        }
    }

    pub fn credential_policy(&self) -> CredentialPolicy {
        CredentialPolicy {
            min_password_len: self.min_password_length,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match self.signing_secret() {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET must be at least {} bytes",
                        MIN_SECRET_LEN
                    ))
                }
                Some(_) => {}
            }
        }

        if self.session_ttl_seconds == 0 {
            return Err("SESSION_TTL_SECONDS must be greater than zero".to_string());
        }

        if self.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(format!(
                "SESSION_TTL_SECONDS must be at most {}",
                MAX_SESSION_TTL_SECONDS
            ));
        }

        if self.restock_window_seconds > MAX_RESTOCK_WINDOW_SECONDS {
            return Err(format!(
                "RESTOCK_WINDOW_SECONDS must be at most {}",
                MAX_RESTOCK_WINDOW_SECONDS
            ));
        }

        if self.min_password_length == 0 {
            return Err("MIN_PASSWORD_LENGTH must be at least 1".to_string());
        }

        if self.low_stock_threshold < 0 {
            return Err("LOW_STOCK_THRESHOLD must not be negative".to_string());
        }

        self.restock_policy().validate()
    }
}
