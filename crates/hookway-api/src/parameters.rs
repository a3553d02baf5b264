//! Remote parameter store used to fetch the path configuration document.
//!
//! The production store talks to the local parameters-and-secrets extension
//! over HTTP. Values are always requested decrypted.

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ConfigSource;

/// Header carrying the extension's session token.
pub const SESSION_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

/// A retrieved parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Decrypted value.
    pub value: String,
    /// Version of the value.
    pub version: i64,
}

/// Parameter lookup failures.
#[derive(Debug, Error)]
pub enum ParameterError {
    /// The parameter store could not be reached.
    #[error("parameter request failed: {message}")]
    Request {
        /// Error message describing the failure
        message: String,
    },

    /// The parameter store answered with a non-success status.
    #[error("parameter {name} unavailable: HTTP {status_code}: {body}")]
    Status {
        /// Parameter that was requested
        name: String,
        /// HTTP status code
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// The parameter store answered with a body that could not be decoded.
    #[error("invalid parameter response: {message}")]
    InvalidResponse {
        /// Decode error message
        message: String,
    },
}

/// Parameter store operations needed at startup.
pub trait ParameterStore: Send + Sync {
    /// Fetches the decrypted value of `name`.
    fn get_parameter<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Parameter, ParameterError>> + Send + 'a>>;
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterResponse {
    parameter: ParameterBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterBody {
    value: String,
    #[serde(default)]
    version: i64,
}

/// Parameter store backed by the local extension's HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpParameterStore {
    client: reqwest::Client,
    endpoint: Url,
    session_token: Option<String>,
}

impl HttpParameterStore {
    /// Creates a client for the extension at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError::Request` if the endpoint is not a base URL or
    /// the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        session_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ParameterError> {
        let endpoint = Url::parse(endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ParameterError::Request {
                message: format!("invalid parameter endpoint: {endpoint}"),
            })?;

        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            ParameterError::Request { message: format!("failed to build HTTP client: {e}") }
        })?;

        Ok(Self { client, endpoint, session_token })
    }

    fn parameter_url(&self, name: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["systemsmanager", "parameters", "get"]);
        }
        url.query_pairs_mut().append_pair("name", name).append_pair("withDecryption", "true");
        url
    }

    async fn fetch(&self, name: &str) -> Result<Parameter, ParameterError> {
        let mut request = self.client.get(self.parameter_url(name));
        if let Some(token) = &self.session_token {
            request = request.header(SESSION_TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ParameterError::Request { message: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ParameterError::Request { message: e.to_string() })?;

        if !status.is_success() {
            warn!(name, status = status.as_u16(), "Parameter lookup rejected");
            return Err(ParameterError::Status {
                name: name.to_string(),
                status_code: status.as_u16(),
                body,
            });
        }

        let decoded: GetParameterResponse = serde_json::from_str(&body)
            .map_err(|e| ParameterError::InvalidResponse { message: e.to_string() })?;

        Ok(Parameter { value: decoded.parameter.value, version: decoded.parameter.version })
    }
}

impl ParameterStore for HttpParameterStore {
    fn get_parameter<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Parameter, ParameterError>> + Send + 'a>> {
        Box::pin(self.fetch(name))
    }
}

/// Returns the raw path configuration document for `source`.
///
/// # Errors
///
/// Returns `ParameterError` if a parameter lookup fails.
pub async fn resolve_config_document(
    source: &ConfigSource,
    store: &dyn ParameterStore,
) -> Result<String, ParameterError> {
    match source {
        ConfigSource::Inline(document) => {
            debug!(size = document.len(), "Using inline configuration");
            Ok(document.clone())
        },
        ConfigSource::Parameter(name) => {
            let parameter = store.get_parameter(name).await?;
            info!(name = %name, version = parameter.version, "Loaded configuration parameter");
            Ok(parameter.value)
        },
    }
}
