//! HTTP request handlers for the gateway.
//!
//! - `ingest` - every configured webhook path
//! - `health` - liveness check
//!
//! Failures are returned as `{"error": {"code", "message"}}` with a status
//! derived from the error kind. Store details never reach the caller.

pub mod health;
pub mod ingest;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hookway_core::{FailureKind, GatewayError};
use serde::Serialize;

pub use health::health_check;
pub use ingest::ingest_webhook;

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code from the gateway taxonomy (E1001-E3002)
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(error: &GatewayError) -> Self {
        Self {
            error: ErrorDetail {
                code: error.code().to_string(),
                message: error.public_message(),
            },
        }
    }
}

/// HTTP status reported for each failure kind.
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::ConfigInvalid => StatusCode::INTERNAL_SERVER_ERROR,
        FailureKind::MissingPath => StatusCode::NOT_FOUND,
        FailureKind::AuthFailed => StatusCode::UNAUTHORIZED,
        FailureKind::DecodeError => StatusCode::BAD_REQUEST,
        FailureKind::DispatchError => StatusCode::BAD_GATEWAY,
        FailureKind::BadDocument => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn create_error_response(error: &GatewayError) -> Response {
    (status_for(error.kind()), Json(ErrorResponse::from(error))).into_response()
}
