//! Document store client for the hookway gateway.
//!
//! Implements `hookway_core::DocumentStore` over the store's HTTP API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;

pub use client::{HttpDocumentStore, StoreConfig};

/// Store API server used when none is configured.
pub const DEFAULT_API_SERVER: &str = "https://api.usw2a1.rockset.com";
