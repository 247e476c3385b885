//! Storehouse - inventory API with governed restocks

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storehouse::{
    config::{Args, LogFormat, StoreBackend},
    db::{MemoryStore, MongoClient, MongoStore, PersistentStore},
    server, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("storehouse={},info", args.log_level).into());
    match args.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Storehouse - inventory API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store: {:?}", args.store_backend);
    info!("Session TTL: {}s", args.session_ttl_seconds);
    info!("Low-stock threshold: {}", args.low_stock_threshold);
    info!("======================================");

    let store = open_store(&args).await?;

    let state = Arc::new(AppState::new(args, store)?);
    server::run(state).await?;

    Ok(())
}

/// Open the configured backend. In dev mode an unreachable MongoDB falls
/// back to the in-memory store.
async fn open_store(args: &Args) -> anyhow::Result<Arc<dyn PersistentStore>> {
    match args.store_backend {
        StoreBackend::Memory => {
            if !args.dev_mode {
                warn!("Using in-memory store - data will not survive a restart");
            }
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Mongo => {
            let connected = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
                Ok(client) => MongoStore::connect(&client).await,
                Err(e) => Err(e),
            };
            match connected {
                Ok(store) => {
                    info!("MongoDB connected successfully");
                    Ok(Arc::new(store))
                }
                Err(e) if args.dev_mode => {
                    warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                    Ok(Arc::new(MemoryStore::new()))
                }
                Err(e) => {
                    error!("MongoDB connection failed: {}", e);
                    Err(e.into())
                }
            }
        }
    }
}
