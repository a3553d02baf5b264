//! Request authentication per path policy.
//!
//! Every strategy answers with the same opaque `AuthFailed`; the concrete
//! sub-reason is only logged.

use thiserror::Error;
use tracing::warn;

use crate::{
    crypto::{self, SignatureError},
    models::{AuthPolicy, InboundRequest},
};

/// The request was rejected by its path's authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthFailed;

impl AuthPolicy {
    /// Authenticates `request` against this policy.
    ///
    /// Signatures are checked against the body exactly as received, before
    /// any decoding or wrapping.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailed` for any rejection, whatever the cause.
    pub fn authenticate(&self, request: &InboundRequest) -> Result<(), AuthFailed> {
        match self {
            Self::NoAuth => Ok(()),
            Self::DenyAll(reason) => {
                warn!(path = %request.path, %reason, "Request denied by policy");
                Err(AuthFailed)
            },
            Self::HeaderMatch { header_name, expected_secret } => {
                authenticate_header(request, header_name, expected_secret)
            },
            Self::HmacSignature { header_name, signing_key } => {
                authenticate_signature(request, header_name, signing_key)
            },
        }
    }
}

fn authenticate_header(
    request: &InboundRequest,
    header_name: &str,
    expected_secret: &str,
) -> Result<(), AuthFailed> {
    let Some(presented) = request.header(header_name) else {
        warn!(path = %request.path, header = header_name, "Secret header not found");
        return Err(AuthFailed);
    };

    if presented.is_empty() || !crypto::constant_time_eq(presented.as_bytes(), expected_secret.as_bytes()) {
        warn!(path = %request.path, header = header_name, "Secret header mismatch");
        return Err(AuthFailed);
    }

    Ok(())
}

fn authenticate_signature(
    request: &InboundRequest,
    header_name: &str,
    signing_key: &str,
) -> Result<(), AuthFailed> {
    let header_name = header_name.to_ascii_lowercase();
    let Some(presented) = request.header(&header_name) else {
        warn!(path = %request.path, header = %header_name, "Signature header not found");
        return Err(AuthFailed);
    };

    match crypto::verify_signature(&request.body, presented, signing_key) {
        Ok(()) => Ok(()),
        Err(SignatureError::Mismatch) => {
            warn!(path = %request.path, header = %header_name, "Signature mismatch");
            Err(AuthFailed)
        },
        Err(e) => {
            warn!(path = %request.path, error = %e, "Signature verification failed");
            Err(AuthFailed)
        },
    }
}
