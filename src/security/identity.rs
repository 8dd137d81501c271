//! Client identity selection for rate limiting.
//!
//! Authenticated callers are bucketed by user id (`user:<sub>`), anonymous
//! callers by source address (`ip:<addr>`). The bearer token is *not*
//! verified here; verification belongs to the downstream auth layer. The
//! gateway only needs a stable bucketing key, so it reads the JWT `sub`
//! claim without checking the signature.

use std::net::SocketAddr;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Rate limiting tier derived from the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Anonymous,
    Authenticated,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Anonymous => write!(f, "anonymous"),
            Tier::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Identity a rate-limit window is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey {
    pub key: String,
    pub tier: Tier,
}

impl ClientKey {
    pub fn anonymous(addr: SocketAddr) -> Self {
        Self {
            key: format!("ip:{}", addr.ip()),
            tier: Tier::Anonymous,
        }
    }

    pub fn authenticated(user_id: &str) -> Self {
        Self {
            key: format!("user:{}", user_id),
            tier: Tier::Authenticated,
        }
    }
}

/// Derive the client key: user id from a bearer JWT when present, else the
/// source IP.
pub fn client_key(headers: &HeaderMap, remote: SocketAddr) -> ClientKey {
    match bearer_subject(headers) {
        Some(sub) => ClientKey::authenticated(&sub),
        None => ClientKey::anonymous(remote),
    }
}

/// Extract the `sub` claim from an unverified bearer JWT, if any.
fn bearer_subject(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;

    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    // A JWT has exactly three segments.
    segments.next()?;

    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    claims
        .get("sub")
        .and_then(|s| s.as_str())
        .map(|s| s.to_string())
}
