//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resilience::retry::TransportErrorKind;

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Downstream service definitions.
    pub services: Vec<ServiceConfig>,

    /// Route definitions mapping request paths to services.
    pub routes: Vec<RouteConfig>,

    /// Circuit breaker settings (shared by all downstreams).
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry configuration for outbound calls.
    pub retries: RetryConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes. Bodies are buffered so retried
    /// attempts can replay them.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// A named downstream service reachable at a base URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier (also the circuit breaker key).
    pub name: String,

    /// Base URL requests are forwarded to (e.g., "http://127.0.0.1:3000").
    pub base_url: String,
}

/// Classification of a route for rate limiting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    /// Standard CRUD-style routes.
    #[default]
    Default,

    /// Computationally expensive search-style routes; a stricter limit applies.
    Search,
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteClass::Default => write!(f, "default"),
            RouteClass::Search => write!(f, "search"),
        }
    }
}

/// Route configuration mapping a path prefix to a downstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (e.g., "/api/programs").
    pub path_prefix: String,

    /// Downstream service name to forward to.
    pub service: String,

    /// Rate limiting class for this route.
    #[serde(default)]
    pub route_class: RouteClass,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Strip the matched prefix before forwarding (default: true).
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: bool,
}

fn default_strip_prefix() -> bool {
    true
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a half-open probe is allowed.
    pub cooldown_secs: u64,

    /// Whether 4xx responses (other than 429) count as circuit failures.
    /// The default counts every non-success response, which conflates caller
    /// input quality with downstream health; set false to exclude them.
    pub count_client_errors: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 30,
            count_client_errors: true,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per dispatch, including the first (1 = no retries).
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound on any single backoff delay in milliseconds.
    pub max_delay_ms: u64,

    /// Backoff multiplier applied per attempt.
    pub multiplier: u32,

    /// Response status codes eligible for retry.
    pub retryable_status_codes: Vec<u16>,

    /// Transport error classes eligible for retry.
    pub retryable_transport_errors: Vec<TransportErrorKind>,

    /// Add bounded jitter to backoff delays (never exceeds max_delay_ms).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            multiplier: 2,
            retryable_status_codes: vec![429, 502, 503, 504],
            retryable_transport_errors: vec![
                TransportErrorKind::ConnectionRefused,
                TransportErrorKind::ConnectionReset,
                TransportErrorKind::DnsFailure,
                TransportErrorKind::Timeout,
            ],
            jitter: false,
        }
    }
}

/// Rate limiting configuration (fixed window, per client key and route class).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window size in seconds.
    pub window_secs: u64,

    /// Per-window limit for anonymous clients (keyed by source IP).
    pub anonymous_limit: u64,

    /// Per-window limit for authenticated clients (keyed by user id).
    pub authenticated_limit: u64,

    /// Per-window limit for search-class routes, regardless of identity.
    pub search_limit: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            anonymous_limit: 60,
            authenticated_limit: 300,
            search_limit: 30,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Overall deadline for one inbound request, covering the whole retry
    /// sequence, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
