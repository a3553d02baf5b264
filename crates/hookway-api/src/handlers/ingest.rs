//! Webhook ingestion handler.
//!
//! Turns any HTTP request into an `InboundRequest` and runs it through the
//! pipeline. The path decides everything; the method does not matter.

use std::collections::HashMap;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use hookway_core::{Delivery, Handler, InboundRequest};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::create_error_response;

/// Header announcing that the body is base64 encoded by the transport.
const CONTENT_TRANSFER_ENCODING: &str = "content-transfer-encoding";

/// Response from successful ingestion.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Always `ok`
    pub status: &'static str,
    /// Workspace the payload was added to
    pub workspace: String,
    /// Collection the payload was added to
    pub collection: String,
    /// Number of documents added
    pub documents: usize,
}

impl From<Delivery> for IngestResponse {
    fn from(delivery: Delivery) -> Self {
        Self {
            status: "ok",
            workspace: delivery.workspace,
            collection: delivery.collection,
            documents: delivery.documents,
        }
    }
}

/// Ingests a webhook for the request's path.
///
/// Returns appropriate HTTP status codes:
/// - 200: Payload added
/// - 400: Body could not be decoded
/// - 401: Authentication failed
/// - 404: Path not configured
/// - 422: Store rejected a document
/// - 502: Store call failed
#[instrument(
    name = "ingest_webhook",
    skip(handler, headers, body),
    fields(path = %uri.path(), content_length = body.len())
)]
pub async fn ingest_webhook(
    State(handler): State<Handler>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = inbound_request(&uri, &headers, body);

    match handler.handle_payload(&request).await {
        Ok(delivery) => {
            info!(workspace = %delivery.workspace, collection = %delivery.collection, "Webhook ingested");
            (StatusCode::OK, Json(IngestResponse::from(delivery))).into_response()
        },
        Err(e) => {
            warn!(code = e.code(), kind = %e.kind(), "Webhook rejected");
            create_error_response(&e)
        },
    }
}

/// Builds the pipeline request from the HTTP parts.
fn inbound_request(uri: &Uri, headers: &HeaderMap, body: Bytes) -> InboundRequest {
    let headers = extract_headers(headers);
    let is_base64_encoded = headers
        .get(CONTENT_TRANSFER_ENCODING)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("base64"));

    InboundRequest { path: uri.path().to_string(), headers, body, is_base64_encoded }
}

/// Flattens headers to lowercase name -> first value, dropping non-UTF-8
/// values.
fn extract_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut extracted = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            extracted.entry(name.as_str().to_string()).or_insert_with(|| value.to_string());
        }
    }
    extracted
}
