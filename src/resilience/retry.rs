//! Retrying outbound HTTP execution.
//!
//! # Responsibilities
//! - Classify responses and transport errors as retryable or not
//! - Execute one logical call as up to `max_attempts` network attempts,
//!   backing off between attempts
//! - Surface the *last* attempt's outcome when retries are exhausted; there
//!   is no separate "retries exhausted" error type
//!
//! # Design Decisions
//! - The backoff wait suspends only the calling task and holds no locks
//! - Non-retryable transport errors propagate on the first occurrence
//! - Retryable status codes are configuration, not hardcoded policy

use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Retry parameters for one dispatch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: u32,
    pub retryable_status_codes: Vec<u16>,
    pub retryable_transport_errors: Vec<TransportErrorKind>,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay_ms: config.initial_delay_ms,
            max_delay_ms: config.max_delay_ms,
            multiplier: config.multiplier.max(1),
            retryable_status_codes: config.retryable_status_codes.clone(),
            retryable_transport_errors: config.retryable_transport_errors.clone(),
            jitter: config.jitter,
        }
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status.as_u16())
    }

    pub fn is_retryable_transport(&self, kind: TransportErrorKind) -> bool {
        self.retryable_transport_errors.contains(&kind)
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.initial_delay_ms,
            self.multiplier,
            self.max_delay_ms,
            self.jitter,
        )
    }
}

/// Transport error categories. Which of them are eligible for retry is
/// policy (`retryable_transport_errors`); `Other` covers everything
/// non-transient (malformed request, protocol violations) and is not in the
/// default retryable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    ConnectionRefused,
    ConnectionReset,
    DnsFailure,
    Timeout,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::ConnectionReset => "connection reset",
            TransportErrorKind::DnsFailure => "dns failure",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Other => "transport error",
        };
        write!(f, "{}", s)
    }
}

/// Walk the source chain and classify a transport failure.
pub fn classify_transport_error(err: &(dyn std::error::Error + 'static)) -> TransportErrorKind {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    return TransportErrorKind::ConnectionRefused
                }
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe => return TransportErrorKind::ConnectionReset,
                std::io::ErrorKind::TimedOut => return TransportErrorKind::Timeout,
                _ => {}
            }
        }
        if let Some(h) = e.downcast_ref::<hyper::Error>() {
            if h.is_timeout() {
                return TransportErrorKind::Timeout;
            }
        }
        // Resolver failures only identify themselves by message.
        if e.to_string().to_ascii_lowercase().contains("dns") {
            return TransportErrorKind::DnsFailure;
        }
        current = e.source();
    }
    TransportErrorKind::Other
}

/// Final transport failure surfaced by the retryer.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct UpstreamError {
    pub kind: TransportErrorKind,
    pub message: String,
}

/// One logical outbound call; each attempt replays the same buffered body.
#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub service: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Execution interface the dispatcher depends on; substitutable in tests.
#[async_trait]
pub trait Retryer: Send + Sync {
    /// Execute `call`, retrying per policy. A returned response may carry any
    /// status code, including a retryable one once attempts are exhausted.
    async fn execute(&self, call: OutboundCall) -> Result<Response<Body>, UpstreamError>;
}

/// Retryer backed by a shared hyper connection pool.
pub struct HttpRetryer {
    client: Client<HttpConnector, Body>,
    policy: RetryPolicy,
}

impl HttpRetryer {
    pub fn new(policy: RetryPolicy, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, policy }
    }

    fn build_request(&self, call: &OutboundCall) -> Result<Request<Body>, UpstreamError> {
        let mut builder = Request::builder()
            .method(call.method.clone())
            .uri(call.uri.clone());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(call.headers.clone());
        }
        builder
            .body(Body::from(call.body.clone()))
            .map_err(|e| UpstreamError {
                kind: TransportErrorKind::Other,
                message: format!("failed to build outbound request: {}", e),
            })
    }
}

#[async_trait]
impl Retryer for HttpRetryer {
    async fn execute(&self, call: OutboundCall) -> Result<Response<Body>, UpstreamError> {
        let mut attempt = 1u32;
        loop {
            let req = self.build_request(&call)?;
            match self.client.request(req).await {
                Ok(response) => {
                    let status = response.status();
                    if self.policy.is_retryable_status(status)
                        && attempt < self.policy.max_attempts
                    {
                        let delay = self.policy.delay_after(attempt);
                        tracing::info!(
                            service = %call.service,
                            attempt,
                            status = %status,
                            delay = ?delay,
                            "Retrying after retryable status"
                        );
                        metrics::record_retry(&call.service);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response.map(Body::new));
                }
                Err(e) => {
                    let mut kind = classify_transport_error(&e);
                    if kind == TransportErrorKind::Other && e.is_connect() {
                        kind = TransportErrorKind::ConnectionRefused;
                    }
                    if self.policy.is_retryable_transport(kind) && attempt < self.policy.max_attempts
                    {
                        let delay = self.policy.delay_after(attempt);
                        tracing::info!(
                            service = %call.service,
                            attempt,
                            error = %e,
                            delay = ?delay,
                            "Retrying after transport error"
                        );
                        metrics::record_retry(&call.service);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(UpstreamError {
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_system_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 10_000);
        assert_eq!(policy.multiplier, 2);
        assert!(!policy.jitter);
    }

    #[test]
    fn test_retryable_status_membership() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(policy.is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(policy.is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(policy.is_retryable_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!policy.is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!policy.is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!policy.is_retryable_status(StatusCode::OK));
    }

    #[test]
    fn test_classify_io_errors() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            classify_transport_error(&refused),
            TransportErrorKind::ConnectionRefused
        );

        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(
            classify_transport_error(&reset),
            TransportErrorKind::ConnectionReset
        );

        let timed_out = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(
            classify_transport_error(&timed_out),
            TransportErrorKind::Timeout
        );
    }

    #[test]
    fn test_classify_dns_by_message() {
        let err = std::io::Error::other("dns error: failed to lookup address");
        assert_eq!(
            classify_transport_error(&err),
            TransportErrorKind::DnsFailure
        );
    }

    #[test]
    fn test_classify_unknown_is_not_retryable() {
        let err = std::io::Error::other("something odd");
        let kind = classify_transport_error(&err);
        assert_eq!(kind, TransportErrorKind::Other);
        assert!(!RetryPolicy::default().is_retryable_transport(kind));
    }

    #[test]
    fn test_default_transport_retryable_set() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable_transport(TransportErrorKind::ConnectionRefused));
        assert!(policy.is_retryable_transport(TransportErrorKind::ConnectionReset));
        assert!(policy.is_retryable_transport(TransportErrorKind::DnsFailure));
        assert!(policy.is_retryable_transport(TransportErrorKind::Timeout));
        assert!(!policy.is_retryable_transport(TransportErrorKind::Other));
    }

    #[test]
    fn test_transport_retryability_follows_config() {
        let config = RetryConfig {
            retryable_transport_errors: vec![TransportErrorKind::ConnectionRefused],
            ..RetryConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert!(policy.is_retryable_transport(TransportErrorKind::ConnectionRefused));
        assert!(!policy.is_retryable_transport(TransportErrorKind::Timeout));
        assert!(!policy.is_retryable_transport(TransportErrorKind::DnsFailure));
    }
}
