//! Immutable path-to-policy registry.
//!
//! Built once from the configuration document at startup and shared
//! read-only by every request afterwards.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    error::{GatewayError, Result},
    models::{AuthPolicy, ConfigDocument, DenyReason, PathPolicy},
};

/// Mapping from exact request path to its policy.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, PathPolicy>,
}

impl PolicyRegistry {
    /// Parses a JSON configuration document into a registry.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ConfigInvalid` if the document is not a JSON
    /// object of path entries, or an entry lacks a `collection`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let document: ConfigDocument = serde_json::from_str(raw)
            .map_err(|e| GatewayError::config(format!("failed to parse path configuration: {e}")))?;

        Ok(Self::from_document(document))
    }

    /// Builds a registry from an already parsed document.
    pub fn from_document(document: ConfigDocument) -> Self {
        let policies: HashMap<String, PathPolicy> = document
            .into_iter()
            .map(|(path, config)| {
                let policy = PathPolicy::from(config);
                if let AuthPolicy::DenyAll(reason) = &policy.auth {
                    warn!(path = %path, %reason, "Path will reject every request");
                }
                debug!(path = %path, collection = %policy.collection, wrap = policy.wrap, "Registered path");
                (path, policy)
            })
            .collect();

        Self { policies }
    }

    /// Looks up the policy for `path`. Matching is exact and case-sensitive.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::MissingPath` if no policy is registered.
    pub fn resolve(&self, path: &str) -> Result<&PathPolicy> {
        self.policies
            .get(path)
            .ok_or_else(|| GatewayError::MissingPath { path: path.to_string() })
    }

    /// Returns the authentication policy for `path`.
    ///
    /// Unregistered paths get `DenyAll`.
    pub fn authenticator_for(&self, path: &str) -> AuthPolicy {
        match self.policies.get(path) {
            Some(policy) => policy.auth.clone(),
            None => {
                warn!(path = %path, "No config found for path");
                AuthPolicy::DenyAll(DenyReason::UnknownPath)
            },
        }
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no paths are registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Registered paths, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }
}
