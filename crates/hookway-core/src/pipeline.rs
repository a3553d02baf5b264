//! Per-request processing pipeline.
//!
//! Each request runs through a fixed sequence of steps and ends in exactly
//! one outcome:
//!
//! 1. **Resolve** - look up the path's policy (`MissingPath`)
//! 2. **Authenticate** - run the policy's authenticator on the original
//!    request (`AuthFailed`)
//! 3. **Normalize** - decode and optionally wrap the body (`DecodeError`)
//! 4. **Dispatch** - add the payload to the effective workspace and the
//!    policy's collection (`DispatchError`)
//! 5. **Validate** - every returned document must be `ADDED`
//!    (`BadDocument`)
//!
//! Nothing is retried and no state survives the call.

use std::{fmt, sync::Arc};

use tracing::{debug, info, instrument, warn};

use crate::{
    error::{GatewayError, Result},
    models::InboundRequest,
    normalize,
    registry::PolicyRegistry,
    store::{DocumentStatus, DocumentStore},
};

/// Receipt of a successfully processed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Workspace the payload was added to.
    pub workspace: String,
    /// Collection the payload was added to.
    pub collection: String,
    /// Number of documents the store reported as added.
    pub documents: usize,
}

/// Request handler wiring the registry to a document store.
///
/// Cheap to clone; all state is immutable and shared.
#[derive(Clone)]
pub struct Handler {
    store: Arc<dyn DocumentStore>,
    registry: Arc<PolicyRegistry>,
    default_workspace: Arc<str>,
}

impl Handler {
    /// Creates a handler.
    ///
    /// `default_workspace` applies to every path whose policy names none.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<PolicyRegistry>,
        default_workspace: impl Into<Arc<str>>,
    ) -> Self {
        Self { store, registry, default_workspace: default_workspace.into() }
    }

    /// Registry this handler routes with.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Process-wide default workspace.
    pub fn default_workspace(&self) -> &str {
        &self.default_workspace
    }

    /// Processes one inbound request.
    ///
    /// # Errors
    ///
    /// Returns the `GatewayError` of the first failing step.
    #[instrument(name = "handle_payload", skip(self, request), fields(path = %request.path))]
    pub async fn handle_payload(&self, request: &InboundRequest) -> Result<Delivery> {
        debug!(
            headers = ?header_names(request),
            body = %String::from_utf8_lossy(&request.body),
            "Inbound request"
        );

        let policy = self.registry.resolve(&request.path).inspect_err(|_| {
            warn!("No policy registered for path");
        })?;

        policy.auth.authenticate(request)?;

        let payload = normalize::normalize(request, policy)?;

        let workspace = policy.effective_workspace(&self.default_workspace);
        let collection = policy.collection.as_str();

        let statuses = self.store.add_documents(workspace, collection, payload).await.inspect_err(|e| {
            warn!(workspace, collection, error = %e, "Document store call failed");
        })?;

        validate_statuses(workspace, &statuses)?;

        info!(workspace, collection, documents = statuses.len(), "Payload added");
        Ok(Delivery {
            workspace: workspace.to_string(),
            collection: collection.to_string(),
            documents: statuses.len(),
        })
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("paths", &self.registry.len())
            .field("default_workspace", &self.default_workspace)
            .finish_non_exhaustive()
    }
}

/// Sorted header names of `request`. Values carry secrets and signatures and
/// stay out of logs.
fn header_names(request: &InboundRequest) -> Vec<&str> {
    let mut names: Vec<&str> = request.headers.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Fails on the first document whose status is not `ADDED`.
fn validate_statuses(workspace: &str, statuses: &[DocumentStatus]) -> Result<()> {
    match statuses.iter().find(|doc| !doc.is_added()) {
        None => Ok(()),
        Some(doc) => {
            let message = doc.error.as_ref().and_then(|e| e.message.as_deref()).unwrap_or("");
            warn!(
                workspace,
                collection = %doc.collection,
                status = %doc.status,
                error = message,
                "Document was not added"
            );
            Err(GatewayError::BadDocument {
                workspace: workspace.to_string(),
                collection: doc.collection.clone(),
                status: doc.status.clone(),
            })
        },
    }
}
