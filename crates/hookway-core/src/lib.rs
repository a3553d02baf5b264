//! Core of the hookway webhook gateway.
//!
//! Resolves a request path to its policy, authenticates the request with
//! the policy's strategy, normalizes the payload and hands it to a document
//! store, validating the per-document result. Transport, configuration
//! retrieval and the concrete store client live in other crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod crypto;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use auth::AuthFailed;
pub use error::{FailureKind, GatewayError, Result};
pub use models::{
    AuthConfig, AuthPolicy, ConfigDocument, DenyReason, InboundRequest, PathConfig, PathPolicy,
    DEFAULT_SIGNATURE_HEADER,
};
pub use pipeline::{Delivery, Handler};
pub use registry::PolicyRegistry;
pub use store::{DocumentStatus, DocumentStore, StoreError, StoreResult, ADDED};
