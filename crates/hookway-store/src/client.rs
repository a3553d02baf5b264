//! HTTP client for the document store's add-documents API.
//!
//! Sends `POST {api_server}/v1/orgs/self/ws/{workspace}/collections/{collection}/docs`
//! with the payload embedded verbatim under `data`, and categorizes failures
//! for the pipeline. No retries happen here.

use std::{fmt, future::Future, pin::Pin, time::Duration};

use bytes::Bytes;
use hookway_core::{DocumentStatus, DocumentStore, StoreError, StoreResult};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Url,
};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::{info_span, Instrument};

use crate::DEFAULT_API_SERVER;

/// Largest error response body kept for diagnostics.
const MAX_ERROR_BODY_SIZE: usize = 1024;

/// Configuration for the document store client.
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the store API.
    pub api_server: String,
    /// API key sent as `Authorization: ApiKey <key>`.
    pub api_key: String,
    /// Timeout for a single add-documents call.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_server: DEFAULT_API_SERVER.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("hookway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_server", &self.api_server)
            .field("api_key", &"***")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Serialize)]
struct AddDocumentsRequest<'a> {
    data: &'a RawValue,
}

#[derive(Deserialize)]
struct AddDocumentsResponse {
    #[serde(default)]
    data: Vec<DocumentStatus>,
}

/// Document store client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: Url,
    config: StoreConfig,
}

impl HttpDocumentStore {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the API server is not a usable
    /// base URL or the HTTP client cannot be built.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let base_url = Url::parse(&config.api_server)
            .map_err(|e| StoreError::configuration(format!("invalid api server: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::configuration(format!(
                "api server {} cannot be used as a base URL",
                config.api_server
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| StoreError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url, config })
    }

    /// URL of the add-documents endpoint for `workspace.collection`.
    pub fn documents_url(&self, workspace: &str, collection: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "v1",
                "orgs",
                "self",
                "ws",
                workspace,
                "collections",
                collection,
                "docs",
            ]);
        }
        url
    }

    async fn send(
        &self,
        workspace: &str,
        collection: &str,
        payload: Bytes,
    ) -> StoreResult<Vec<DocumentStatus>> {
        let data: &RawValue = serde_json::from_slice(&payload)
            .map_err(|e| StoreError::invalid_payload(e.to_string()))?;
        let body = serde_json::to_vec(&AddDocumentsRequest { data })
            .map_err(|e| StoreError::invalid_payload(e.to_string()))?;

        let url = self.documents_url(workspace, collection);
        tracing::debug!(%url, payload_size = payload.len(), "Adding documents");

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("ApiKey {}", self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.categorize(&e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let body = truncate_body(&bytes);
            tracing::warn!(status = status.as_u16(), "Store returned error response");
            return Err(if status.is_server_error() {
                StoreError::unavailable(status.as_u16(), body)
            } else {
                StoreError::rejected(status.as_u16(), body)
            });
        }

        let decoded: AddDocumentsResponse = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::invalid_response(e.to_string()))?;

        tracing::debug!(documents = decoded.data.len(), "Store accepted request");
        Ok(decoded.data)
    }

    fn categorize(&self, error: &reqwest::Error) -> StoreError {
        tracing::warn!(error = %error, "Store request failed");

        if error.is_timeout() {
            StoreError::timeout(self.config.timeout.as_secs())
        } else if error.is_connect() {
            StoreError::network(format!("connection failed: {error}"))
        } else {
            StoreError::network(error.to_string())
        }
    }
}

impl DocumentStore for HttpDocumentStore {
    fn add_documents<'a>(
        &'a self,
        workspace: &'a str,
        collection: &'a str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = StoreResult<Vec<DocumentStatus>>> + Send + 'a>> {
        let span = info_span!("add_documents", workspace, collection);
        Box::pin(self.send(workspace, collection, payload).instrument(span))
    }
}

/// Truncates an error body for diagnostics.
///
/// The cut lands on a char boundary, so the result never exceeds
/// `MAX_ERROR_BODY_SIZE` bytes.
fn truncate_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_ERROR_BODY_SIZE {
        return text.into_owned();
    }

    let suffix = "... (truncated)";
    let mut end = MAX_ERROR_BODY_SIZE - suffix.len();
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{suffix}", &text[..end])
}
