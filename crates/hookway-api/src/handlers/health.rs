//! Health check handler for service monitoring.

use axum::{extract::State, Json};
use hookway_core::Handler;
use serde::Serialize;
use tracing::{debug, instrument};

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: &'static str,
    /// Workspace used by paths that name none
    pub workspace: String,
    /// Number of configured paths
    pub paths: usize,
}

/// Liveness endpoint. Does not touch the document store.
#[instrument(name = "health_check", skip(handler))]
pub async fn health_check(State(handler): State<Handler>) -> Json<HealthResponse> {
    let paths = handler.registry().len();
    debug!(paths, "Health check completed");

    Json(HealthResponse {
        status: "healthy",
        workspace: handler.default_workspace().to_string(),
        paths,
    })
}
