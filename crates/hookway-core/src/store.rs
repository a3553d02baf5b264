//! Document store capability consumed by the pipeline.
//!
//! The pipeline only needs one operation: add a raw JSON payload to a
//! workspace/collection and get back one status per document. Production
//! code plugs in an HTTP client; tests use `mock::MockDocumentStore`.

use std::{future::Future, pin::Pin};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status the store reports for a successfully added document.
pub const ADDED: &str = "ADDED";

/// Result type alias for document store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome for one document of an add-documents call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatus {
    /// Collection the document was written to.
    #[serde(rename = "_collection", alias = "collection", default)]
    pub collection: String,
    /// Write status, `ADDED` on success.
    #[serde(default)]
    pub status: String,
    /// Document identifier assigned by the store.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Error detail for rejected documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DocumentError>,
}

impl DocumentStatus {
    /// Creates a status with the given collection and status marker.
    pub fn new(collection: impl Into<String>, status: impl Into<String>) -> Self {
        Self { collection: collection.into(), status: status.into(), id: None, error: None }
    }

    /// Creates an `ADDED` status for `collection`.
    pub fn added(collection: impl Into<String>) -> Self {
        Self::new(collection, ADDED)
    }

    /// Whether the document was added.
    pub fn is_added(&self) -> bool {
        self.status == ADDED
    }
}

/// Error detail attached to a rejected document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentError {
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error type reported by the store.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Failures of the document store call itself.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    Network {
        /// Error message describing the network failure
        message: String,
    },

    /// Request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Store rejected the request (4xx).
    #[error("store rejected request: HTTP {status_code}: {body}")]
    Rejected {
        /// HTTP status code (4xx)
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// Store failed to process the request (5xx).
    #[error("store unavailable: HTTP {status_code}: {body}")]
    Unavailable {
        /// HTTP status code (5xx)
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// Payload is not valid JSON and was not sent.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Parse error message
        message: String,
    },

    /// Store answered with a body that could not be decoded.
    #[error("invalid store response: {message}")]
    InvalidResponse {
        /// Decode error message
        message: String,
    },

    /// Client could not be configured.
    #[error("invalid store configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl StoreError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a rejection error from an HTTP response.
    pub fn rejected(status_code: u16, body: impl Into<String>) -> Self {
        Self::Rejected { status_code, body: body.into() }
    }

    /// Creates an unavailability error from an HTTP response.
    pub fn unavailable(status_code: u16, body: impl Into<String>) -> Self {
        Self::Unavailable { status_code, body: body.into() }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload { message: message.into() }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}

/// Document store operations required by the pipeline.
pub trait DocumentStore: Send + Sync + 'static {
    /// Adds the documents in `payload` (raw JSON) to `workspace.collection`.
    ///
    /// Returns one status per document. A successful call may still contain
    /// documents whose status is not `ADDED`.
    fn add_documents<'a>(
        &'a self,
        workspace: &'a str,
        collection: &'a str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = StoreResult<Vec<DocumentStatus>>> + Send + 'a>>;
}

pub mod mock {
    //! In-memory document store for tests.
    //!
    //! Returns a canned response and records every call so tests can assert
    //! on what would have been dispatched, or that nothing was.

    use std::{future::Future, pin::Pin, sync::Arc};

    use bytes::Bytes;
    use tokio::sync::RwLock;

    use super::{DocumentStatus, DocumentStore, StoreError, StoreResult};

    /// One recorded `add_documents` call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        /// Workspace passed to the store.
        pub workspace: String,
        /// Collection passed to the store.
        pub collection: String,
        /// Payload passed to the store.
        pub payload: Bytes,
    }

    /// Document store double with a fixed response.
    #[derive(Debug, Clone)]
    pub struct MockDocumentStore {
        response: StoreResult<Vec<DocumentStatus>>,
        calls: Arc<RwLock<Vec<RecordedCall>>>,
    }

    impl MockDocumentStore {
        /// Store that answers every call with `statuses`.
        pub fn returning(statuses: Vec<DocumentStatus>) -> Self {
            Self { response: Ok(statuses), calls: Arc::new(RwLock::new(Vec::new())) }
        }

        /// Store that fails every call with `error`.
        pub fn failing(error: StoreError) -> Self {
            Self { response: Err(error), calls: Arc::new(RwLock::new(Vec::new())) }
        }

        /// Calls received so far.
        pub async fn calls(&self) -> Vec<RecordedCall> {
            self.calls.read().await.clone()
        }

        /// Number of calls received so far.
        pub async fn call_count(&self) -> usize {
            self.calls.read().await.len()
        }
    }

    impl DocumentStore for MockDocumentStore {
        fn add_documents<'a>(
            &'a self,
            workspace: &'a str,
            collection: &'a str,
            payload: Bytes,
        ) -> Pin<Box<dyn Future<Output = StoreResult<Vec<DocumentStatus>>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.write().await.push(RecordedCall {
                    workspace: workspace.to_string(),
                    collection: collection.to_string(),
                    payload,
                });
                self.response.clone()
            })
        }
    }
}
