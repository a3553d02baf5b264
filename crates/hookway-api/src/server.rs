//! HTTP server setup and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Handler execution
//!
//! `GET /_/health` is the only reserved route. Every other path and method
//! goes to the ingest handler, which resolves the path against the policy
//! registry.
//!
//! # Graceful Shutdown
//!
//! On SIGTERM or Ctrl+C the server stops accepting connections and waits for
//! in-flight requests to finish.

use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use hookway_core::Handler;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::handlers;

/// Path of the health check.
pub const HEALTH_PATH: &str = "/_/health";

/// Largest accepted request body.
pub const MAX_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::{sync::Arc, time::Duration};
///
/// use hookway_api::server::create_router;
/// use hookway_core::{store::mock::MockDocumentStore, Handler, PolicyRegistry};
///
/// let registry = PolicyRegistry::from_json("{}").unwrap();
/// let store = MockDocumentStore::returning(Vec::new());
/// let handler = Handler::new(Arc::new(store), Arc::new(registry), "commons");
/// let app = create_router(handler, Duration::from_secs(30));
/// // Serve the app...
/// ```
pub fn create_router(handler: Handler, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            HEALTH_PATH,
            get(handlers::health_check).fallback(handlers::ingest_webhook),
        )
        .fallback(handlers::ingest_webhook)
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_SIZE))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(handler)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(
    handler: Handler,
    addr: SocketAddr,
    request_timeout: Duration,
) -> Result<(), std::io::Error> {
    let app = create_router(handler, request_timeout);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
