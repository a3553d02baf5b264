//! Error taxonomy for the request pipeline.
//!
//! Every failure a request can end in maps to exactly one `GatewayError`
//! variant. Each variant carries a stable code so transport adapters and
//! operators can tell failures apart without parsing messages.

use std::fmt;

use thiserror::Error;

use crate::{auth::AuthFailed, store::StoreError};

/// Result type alias using `GatewayError`.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway error types with stable codes.
#[derive(Debug, Error)]
pub enum GatewayError {
    // Startup errors (E1001)
    /// Configuration is absent or could not be parsed (E1001).
    #[error("[E1001] Invalid configuration: {reason}")]
    ConfigInvalid {
        /// What was wrong with the configuration
        reason: String,
    },

    // Request errors (E2001-E2003)
    /// No policy is registered for the request path (E2001).
    #[error("[E2001] Missing path configuration: {path}")]
    MissingPath {
        /// The request path that has no policy
        path: String,
    },

    /// The path's authenticator rejected the request (E2002).
    ///
    /// Deliberately carries no sub-reason.
    #[error("[E2002] Authentication failed")]
    AuthFailed,

    /// The transport-level body encoding could not be decoded (E2003).
    #[error("[E2003] Failed to decode request body: {0}")]
    DecodeError(#[from] base64::DecodeError),

    // Downstream errors (E3001-E3002)
    /// The document store call failed (E3001).
    #[error("[E3001] Failed to add documents: {0}")]
    DispatchError(#[from] StoreError),

    /// The document store accepted the call but rejected a document (E3002).
    #[error("[E3002] Failed to add document: {workspace}.{collection} ({status})")]
    BadDocument {
        /// Workspace the payload was dispatched to
        workspace: String,
        /// Collection reported for the rejected document
        collection: String,
        /// Status reported for the rejected document
        status: String,
    },
}

impl From<AuthFailed> for GatewayError {
    fn from(_: AuthFailed) -> Self {
        Self::AuthFailed
    }
}

impl GatewayError {
    /// Creates a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid { reason: reason.into() }
    }

    /// Returns the error code (E1001-E3002).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConfigInvalid { .. } => "E1001",
            Self::MissingPath { .. } => "E2001",
            Self::AuthFailed => "E2002",
            Self::DecodeError(_) => "E2003",
            Self::DispatchError(_) => "E3001",
            Self::BadDocument { .. } => "E3002",
        }
    }

    /// Returns the failure kind for classification.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::ConfigInvalid { .. } => FailureKind::ConfigInvalid,
            Self::MissingPath { .. } => FailureKind::MissingPath,
            Self::AuthFailed => FailureKind::AuthFailed,
            Self::DecodeError(_) => FailureKind::DecodeError,
            Self::DispatchError(_) => FailureKind::DispatchError,
            Self::BadDocument { .. } => FailureKind::BadDocument,
        }
    }

    /// Message safe to hand back to the request's originator.
    ///
    /// Downstream failures are reduced to a fixed message; their details
    /// belong in logs, not in responses.
    pub fn public_message(&self) -> String {
        match self {
            Self::DispatchError(_) => "[E3001] Failed to add documents".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Startup configuration problem.
    ConfigInvalid,
    /// Unregistered request path.
    MissingPath,
    /// Authenticator rejection.
    AuthFailed,
    /// Body decoding failure.
    DecodeError,
    /// Document store call failure.
    DispatchError,
    /// Document rejected by the store.
    BadDocument,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigInvalid => write!(f, "config_invalid"),
            Self::MissingPath => write!(f, "missing_path"),
            Self::AuthFailed => write!(f, "auth_failed"),
            Self::DecodeError => write!(f, "decode_error"),
            Self::DispatchError => write!(f, "dispatch_error"),
            Self::BadDocument => write!(f, "bad_document"),
        }
    }
}
