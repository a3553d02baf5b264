//! Domain models for path policies and inbound requests.
//!
//! The configuration document types (`PathConfig`, `AuthConfig`) mirror the
//! JSON schema operators write. They are turned into the immutable
//! `PathPolicy` values the pipeline reads, with every unusable auth setting
//! collapsed into `AuthPolicy::DenyAll`.

use std::{collections::HashMap, fmt};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Header carrying the HMAC signature when a policy names none.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-signature";

/// Configuration document: request path to per-path configuration.
pub type ConfigDocument = HashMap<String, PathConfig>;

/// Per-path entry of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Destination workspace. Empty falls back to the process-wide default.
    #[serde(default)]
    pub workspace: String,

    /// Destination collection.
    pub collection: String,

    /// Embed the body as the sole element of a JSON array before dispatch.
    #[serde(default)]
    pub wrap: bool,

    /// Authentication settings. Absent means deny.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Authentication settings as written in the configuration document.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// One of `noop`, `header`, `signature`. Anything else denies.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Expected header value or HMAC signing key.
    #[serde(default)]
    pub secret: String,

    /// Header to read the secret or signature from.
    #[serde(default)]
    pub header: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("kind", &self.kind)
            .field("secret", &"***")
            .field("header", &self.header)
            .finish()
    }
}

/// Routing, authentication and transformation settings for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    /// Destination workspace, `None` when the default applies.
    pub workspace: Option<String>,
    /// Destination collection.
    pub collection: String,
    /// Authentication policy.
    pub auth: AuthPolicy,
    /// Payload-wrap flag.
    pub wrap: bool,
}

impl PathPolicy {
    /// Returns the policy's workspace, or `default` when it has none.
    pub fn effective_workspace<'a>(&'a self, default: &'a str) -> &'a str {
        self.workspace.as_deref().unwrap_or(default)
    }
}

impl From<PathConfig> for PathPolicy {
    fn from(config: PathConfig) -> Self {
        Self {
            workspace: Some(config.workspace).filter(|w| !w.is_empty()),
            collection: config.collection,
            auth: AuthPolicy::from(&config.auth),
            wrap: config.wrap,
        }
    }
}

/// Authentication policy for a path.
///
/// The set of strategies is closed; `DenyAll` is what every missing or
/// unusable setting resolves to.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Always succeeds.
    NoAuth,
    /// Always fails.
    DenyAll(DenyReason),
    /// Named header must equal the expected secret exactly.
    HeaderMatch {
        /// Lowercased header name
        header_name: String,
        /// Expected header value
        expected_secret: String,
    },
    /// Named header must carry the HMAC-SHA256 of the raw body.
    HmacSignature {
        /// Lowercased header name
        header_name: String,
        /// HMAC signing key
        signing_key: String,
    },
}

impl From<&AuthConfig> for AuthPolicy {
    fn from(config: &AuthConfig) -> Self {
        match config.kind.as_str() {
            "noop" => Self::NoAuth,
            "header" if config.header.is_empty() => Self::DenyAll(DenyReason::MissingHeaderName),
            "header" if config.secret.is_empty() => Self::DenyAll(DenyReason::EmptySecret),
            "header" => Self::HeaderMatch {
                header_name: config.header.to_ascii_lowercase(),
                expected_secret: config.secret.clone(),
            },
            "signature" if config.secret.is_empty() => Self::DenyAll(DenyReason::EmptySecret),
            "signature" => Self::HmacSignature {
                header_name: if config.header.is_empty() {
                    DEFAULT_SIGNATURE_HEADER.to_string()
                } else {
                    config.header.to_ascii_lowercase()
                },
                signing_key: config.secret.clone(),
            },
            "" => Self::DenyAll(DenyReason::Unconfigured),
            other => Self::DenyAll(DenyReason::UnrecognizedType(other.to_string())),
        }
    }
}

impl fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAuth => write!(f, "NoAuth"),
            Self::DenyAll(reason) => f.debug_tuple("DenyAll").field(reason).finish(),
            Self::HeaderMatch { header_name, .. } => f
                .debug_struct("HeaderMatch")
                .field("header_name", header_name)
                .field("expected_secret", &"***")
                .finish(),
            Self::HmacSignature { header_name, .. } => f
                .debug_struct("HmacSignature")
                .field("header_name", header_name)
                .field("signing_key", &"***")
                .finish(),
        }
    }
}

/// Why a path was given `AuthPolicy::DenyAll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No auth type configured.
    Unconfigured,
    /// Auth type not one of the known strategies.
    UnrecognizedType(String),
    /// `header` or `signature` policy without a secret.
    EmptySecret,
    /// `header` policy without a header name.
    MissingHeaderName,
    /// Path is not registered at all.
    UnknownPath,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "no auth type configured"),
            Self::UnrecognizedType(kind) => write!(f, "unknown auth type {kind:?}"),
            Self::EmptySecret => write!(f, "empty secret"),
            Self::MissingHeaderName => write!(f, "missing header name"),
            Self::UnknownPath => write!(f, "no config for path"),
        }
    }
}

/// A request as handed over by the transport adapter.
///
/// Header names are expected in lowercase; `with_header` normalizes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    /// Raw request path.
    pub path: String,
    /// Header mapping with lowercase names.
    pub headers: HashMap<String, String>,
    /// Body exactly as received.
    pub body: Bytes,
    /// Body is additionally base64 encoded by the transport.
    pub is_base64_encoded: bool,
}

impl InboundRequest {
    /// Creates a request for `path` with the given body and no headers.
    pub fn new(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { path: path.into(), body: body.into(), ..Self::default() }
    }

    /// Adds a header, lowercasing its name.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Marks the body as base64 encoded.
    #[must_use]
    pub fn base64_encoded(mut self) -> Self {
        self.is_base64_encoded = true;
        self
    }

    /// Looks up a header by its (lowercase) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
