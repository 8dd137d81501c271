//! Request identity and header handling.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) unless the client supplied one
//! - Propagate the ID to the response and the outbound call
//! - Select which inbound headers are forwarded downstream
//!
//! # Design Decisions
//! - A client-supplied correlation ID is honored, never overwritten
//! - Forwarding uses an allowlist; hop-by-hop and host headers never leak

use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// Correlation header used on both inbound and outbound requests.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a fresh UUID v4 request ID for requests that arrive without one.
#[derive(Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Layer that assigns `x-request-id` when absent.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeUuidRequestId> {
    SetRequestIdLayer::x_request_id(MakeUuidRequestId)
}

/// Layer that copies `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Headers forwarded to the downstream. The authorization header must pass
/// through; the rest is content negotiation.
const FORWARDED_HEADERS: &[&str] = &[
    "authorization",
    "content-type",
    "accept",
    "accept-language",
    "user-agent",
];

/// Build the outbound header set from the inbound one.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::new();
    for name in FORWARDED_HEADERS {
        for value in inbound.get_all(*name) {
            outbound.append(*name, value.clone());
        }
    }
    outbound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_allowlist() {
        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer tok"));
        inbound.insert("content-type", HeaderValue::from_static("application/json"));
        inbound.insert("host", HeaderValue::from_static("gateway.example.com"));
        inbound.insert("cookie", HeaderValue::from_static("session=secret"));
        inbound.insert("connection", HeaderValue::from_static("keep-alive"));

        let outbound = forwarded_headers(&inbound);
        assert_eq!(outbound.get("authorization").unwrap(), "Bearer tok");
        assert_eq!(outbound.get("content-type").unwrap(), "application/json");
        assert!(outbound.get("host").is_none());
        assert!(outbound.get("cookie").is_none());
        assert!(outbound.get("connection").is_none());
    }

    #[test]
    fn test_make_request_id_is_unique() {
        let mut make = MakeUuidRequestId;
        let req = Request::builder().body(()).unwrap();
        let a = make.make_request_id(&req).unwrap();
        let b = make.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
