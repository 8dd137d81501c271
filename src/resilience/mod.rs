//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → circuit_breaker.rs (reject fast if the downstream is tripped)
//!     → retry.rs (attempt, classify failure, retry with backoff)
//!     → backoff.rs (delay math)
//!     → outcome reported back to circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Per-downstream circuit breaker isolates failures to the struggling service
//! - Retries are bounded and never add a distinct "exhausted" error type
//! - Backoff waits suspend only the calling task; no lock is held across them

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{BreakerSettings, CircuitBreak, CircuitBreakerRegistry, CircuitStatus};
pub use retry::{HttpRetryer, OutboundCall, RetryPolicy, Retryer, UpstreamError};
