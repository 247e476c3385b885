//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling, one task per
//! connection.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{CredentialHasher, IdentityService, SessionCodec, SessionGuard};
use crate::config::Args;
use crate::db::PersistentStore;
use crate::inventory::{ItemService, RestockGovernor};
use crate::routes::{self, ResponseBody};
use crate::types::StorehouseError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn PersistentStore>,
    /// Registration and login
    pub identity: IdentityService,
    /// Bearer gate for `/api/*`
    pub guard: SessionGuard,
    pub items: ItemService,
    pub restock: RestockGovernor,
    pub started_at: Instant,
}

impl AppState {
    /// Wire services over a store.
    ///
    /// The signing secret is read once here and fixed for the life of the
    /// process. Dev mode without a secret falls back to a well-known key.
    pub fn new(args: Args, store: Arc<dyn PersistentStore>) -> Result<Self, StorehouseError> {
        let codec = match args.signing_secret() {
            Some(secret) => SessionCodec::new(secret, args.session_ttl_seconds)?,
            None if args.dev_mode => {
                warn!("JWT_SECRET not set - signing sessions with the INSECURE dev secret");
                SessionCodec::new_dev(args.session_ttl_seconds)
            }
            None => {
                return Err(StorehouseError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };
        let codec = Arc::new(codec);

        let identity = IdentityService::new(
            Arc::clone(&store),
            Arc::clone(&codec),
            Arc::new(CredentialHasher::default()),
            args.credential_policy(),
        );
        let guard = SessionGuard::new(codec);
        let items = ItemService::new(Arc::clone(&store), args.low_stock_threshold);
        let restock = RestockGovernor::new(Arc::clone(&store), args.restock_policy());

        Ok(Self {
            args,
            store,
            identity,
            guard,
            items,
            restock,
            started_at: Instant::now(),
        })
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), StorehouseError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Storehouse listening on {} (store: {})",
        state.args.listen,
        state.store.backend_name()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    let policy = state.restock.policy();
    info!(
        "Restock policy: {}-{} units, max {} per {}s window",
        policy.min_amount,
        policy.max_amount,
        policy.max_per_window,
        policy.window.num_seconds()
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<ResponseBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = routes::route(state, req).await;

    info!(
        "[{}] {} {} -> {} ({} ms)",
        addr,
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    Ok(response)
}
