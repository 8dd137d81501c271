//! Caller-facing error taxonomy.
//!
//! Every failure the gateway can produce on its own (as opposed to a
//! downstream response it forwards verbatim) is one of these variants. Raw
//! transport errors never leak to the caller; the dispatcher converts them
//! before they reach the response path.

use axum::http::StatusCode;
use thiserror::Error;

use crate::resilience::circuit_breaker::CircuitStatus;

/// Errors surfaced to the original caller, each with a stable machine
/// readable code and HTTP status.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Inbound request rejected by the rate limiter. Detected before any
    /// network attempt; never retried.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Circuit breaker rejected the call without contacting the downstream.
    #[error("circuit {state} for service '{service}'")]
    CircuitOpen {
        service: String,
        state: CircuitStatus,
    },

    /// Downstream unreachable at the connection level after retries were
    /// exhausted (or a non-retryable transport failure occurred).
    #[error("service '{service}' unreachable: {reason}")]
    Unreachable { service: String, reason: String },

    /// The overall request deadline fired before the retry sequence finished.
    #[error("request to service '{service}' timed out")]
    Timeout { service: String },

    /// No configured route matched the request path.
    #[error("no route matched '{path}'")]
    RouteNotFound { path: String },

    /// Request body exceeded the configured buffer cap.
    #[error("request body too large")]
    BodyTooLarge,

    /// Unexpected internal failure (task panic, impossible state). Logged
    /// with full context at the point of detection.
    #[error("internal gateway error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Unreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            GatewayError::CircuitOpen { .. } => "SERVICE_UNAVAILABLE",
            GatewayError::Unreachable { .. } => "EXTERNAL_SERVICE_UNAVAILABLE",
            GatewayError::Timeout { .. } => "TIMEOUT",
            GatewayError::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            GatewayError::BodyTooLarge => "BODY_TOO_LARGE",
            GatewayError::Internal { .. } => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_mapping() {
        let err = GatewayError::RateLimited {
            retry_after_secs: 12,
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.code(), "RATE_LIMIT_EXCEEDED");

        let err = GatewayError::CircuitOpen {
            service: "metadata".into(),
            state: CircuitStatus::Open,
        };
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "SERVICE_UNAVAILABLE");

        let err = GatewayError::Unreachable {
            service: "metadata".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(err.code(), "EXTERNAL_SERVICE_UNAVAILABLE");

        let err = GatewayError::Timeout {
            service: "metadata".into(),
        };
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.code(), "TIMEOUT");
    }
}
