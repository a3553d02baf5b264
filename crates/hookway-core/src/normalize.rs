//! Payload normalization between authentication and dispatch.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::Result,
    models::{InboundRequest, PathPolicy},
};

/// Decodes the transport-level base64 encoding, if the request declares one.
///
/// Line breaks are skipped, so MIME-style wrapped encodings decode too.
///
/// # Errors
///
/// Returns the decoder error for malformed base64.
pub fn decode_body(request: &InboundRequest) -> std::result::Result<Bytes, base64::DecodeError> {
    if request.is_base64_encoded {
        let encoded: Vec<u8> =
            request.body.iter().copied().filter(|b| !matches!(b, b'\r' | b'\n')).collect();
        STANDARD.decode(encoded).map(Bytes::from)
    } else {
        Ok(request.body.clone())
    }
}

/// Embeds `body` as the sole element of a JSON array.
pub fn wrap_in_array(body: &[u8]) -> Bytes {
    let mut wrapped = BytesMut::with_capacity(body.len() + 2);
    wrapped.put_u8(b'[');
    wrapped.put_slice(body);
    wrapped.put_u8(b']');
    wrapped.freeze()
}

/// Produces the payload to dispatch for `request` under `policy`.
///
/// # Errors
///
/// Returns `GatewayError::DecodeError` if the body cannot be decoded.
pub fn normalize(request: &InboundRequest, policy: &PathPolicy) -> Result<Bytes> {
    let body = decode_body(request)?;

    if policy.wrap {
        tracing::debug!(path = %request.path, "Wrapping payload in [...]");
        Ok(wrap_in_array(&body))
    } else {
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FailureKind,
        models::{AuthPolicy, PathPolicy},
    };

    fn policy(wrap: bool) -> PathPolicy {
        PathPolicy { workspace: None, collection: "collection".into(), auth: AuthPolicy::NoAuth, wrap }
    }

    #[test]
    fn plain_body_passes_through() {
        let request = InboundRequest::new("/path", r#"{"k":1}"#);
        assert_eq!(normalize(&request, &policy(false)).unwrap(), Bytes::from_static(br#"{"k":1}"#));
    }

    #[test]
    fn wrap_embeds_body_in_array() {
        let request = InboundRequest::new("/path", r#"{"k":1}"#);
        assert_eq!(normalize(&request, &policy(true)).unwrap(), Bytes::from_static(br#"[{"k":1}]"#));
    }

    #[test]
    fn base64_body_is_decoded() {
        let request = InboundRequest::new("/path", STANDARD.encode(r#"{"k":1}"#)).base64_encoded();

        assert_eq!(normalize(&request, &policy(false)).unwrap(), Bytes::from_static(br#"{"k":1}"#));
        assert_eq!(normalize(&request, &policy(true)).unwrap(), Bytes::from_static(br#"[{"k":1}]"#));
    }

    #[test]
    fn base64_text_without_flag_is_untouched() {
        let encoded = STANDARD.encode("body");
        let request = InboundRequest::new("/path", encoded.clone());

        assert_eq!(decode_body(&request).unwrap(), Bytes::from(encoded));
    }

    #[test]
    fn line_wrapped_base64_is_decoded() {
        let document = format!(r#"{{"items":"{}"}}"#, "x".repeat(200));
        let encoded = STANDARD.encode(&document);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        assert!(wrapped.contains('\n'));

        let request = InboundRequest::new("/path", wrapped).base64_encoded();

        assert_eq!(decode_body(&request).unwrap(), Bytes::from(document));
    }

    #[test]
    fn bare_newlines_are_skipped() {
        let request = InboundRequest::new("/path", "eyJrIjox\nfQ==\n").base64_encoded();

        assert_eq!(decode_body(&request).unwrap(), Bytes::from_static(br#"{"k":1}"#));
    }

    #[test]
    fn malformed_base64_is_decode_error() {
        let request = InboundRequest::new("/path", "not base64!").base64_encoded();

        let error = normalize(&request, &policy(false)).unwrap_err();
        assert_eq!(error.kind(), FailureKind::DecodeError);
    }

    #[test]
    fn wrap_empty_body() {
        assert_eq!(wrap_in_array(b""), Bytes::from_static(b"[]"));
    }
}
