//! HMAC-SHA256 signing and signature verification.
//!
//! Signatures are lowercase hex digests of the raw body. Presented values
//! may carry an algorithm tag (`sha256=<hex>`, `v1=<hex>`); everything up to
//! and including the first `=` is dropped before comparison.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signature verification errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The signing key could not be used.
    InvalidKey,
    /// The presented signature does not match the body.
    Mismatch,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid signing key"),
            Self::Mismatch => write!(f, "signature mismatch"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// Generates the HMAC-SHA256 of `payload` as a lowercase hex string.
///
/// # Errors
///
/// Returns `SignatureError::InvalidKey` if the key is rejected by the MAC.
///
/// # Example
///
/// ```
/// use hookway_core::crypto::sign;
///
/// let signature = sign(b"body", "secret").unwrap();
/// assert_eq!(signature, "dc46983557fea127b43af721467eb9b3fde2338fe3e14f51952aa8478c13d355");
/// ```
pub fn sign(payload: &[u8], key: &str) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;

    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Strips an optional `algorithm=` prefix from a presented signature.
///
/// Splits once on the first `=`, so `sha256=abc` becomes `abc` and a bare
/// digest is returned unchanged.
pub fn strip_algorithm_prefix(signature: &str) -> &str {
    match signature.split_once('=') {
        Some((_, digest)) => digest,
        None => signature,
    }
}

/// Verifies a presented signature against the HMAC of `payload`.
///
/// # Errors
///
/// Returns `SignatureError::Mismatch` unless the digest (after prefix
/// stripping) equals the computed one.
pub fn verify_signature(payload: &[u8], presented: &str, key: &str) -> Result<(), SignatureError> {
    let expected = sign(payload, key)?;

    if constant_time_eq(expected.as_bytes(), strip_algorithm_prefix(presented).as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Compares two byte strings without early exit on the first difference.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
