//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: downstream assumed down, requests fail fast
//! - Half-Open: testing if the downstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: first allow() after the cooldown elapses (that caller
//!                   becomes the probe)
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails
//! ```
//!
//! # Design Decisions
//! - Per-service breaker (not global): a dying metadata service must not
//!   throttle calls to a healthy search service behind the same gateway
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open, guarded by a probe-in-flight flag
//! - State records are created lazily and live for the process lifetime

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics;

/// Externally visible breaker state for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitStatus::Closed => write!(f, "CLOSED"),
            CircuitStatus::Open => write!(f, "OPEN"),
            CircuitStatus::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Decision interface the dispatcher depends on; substitutable in tests.
pub trait CircuitBreak: Send + Sync {
    /// May this call proceed? The first caller after the cooldown wins the
    /// half-open probe slot as a side effect.
    fn allow(&self, service: &str) -> bool;

    /// Report a successful outcome for `service`. Unknown services are
    /// bootstrapped Closed first.
    fn record_success(&self, service: &str);

    /// Report a failed outcome for `service`. Unknown services are
    /// bootstrapped Closed first.
    fn record_failure(&self, service: &str);

    /// Current status, for diagnostics and response shaping.
    fn state(&self, service: &str) -> CircuitStatus;
}

#[derive(Debug)]
struct CircuitState {
    status: CircuitStatus,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    last_state_change_at: Instant,
    probe_in_flight: bool,
}

impl CircuitState {
    fn new() -> Self {
        Self {
            status: CircuitStatus::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            last_state_change_at: Instant::now(),
            probe_in_flight: false,
        }
    }
}

/// Settings shared by every per-service breaker.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Registry of per-service circuit breakers.
///
/// Each service has its own lock; different service names never contend.
pub struct CircuitBreakerRegistry {
    settings: BreakerSettings,
    services: DashMap<String, Arc<Mutex<CircuitState>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            services: DashMap::new(),
        }
    }

    fn entry(&self, service: &str) -> Arc<Mutex<CircuitState>> {
        self.services
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(CircuitState::new())))
            .clone()
    }
}

impl CircuitBreak for CircuitBreakerRegistry {
    fn allow(&self, service: &str) -> bool {
        let entry = self.entry(service);
        let mut st = entry.lock().expect("circuit state mutex poisoned");
        match st.status {
            CircuitStatus::Closed => true,
            CircuitStatus::Open => {
                if st.last_state_change_at.elapsed() >= self.settings.cooldown {
                    // This caller becomes the probe; concurrent callers that
                    // arrived while still Open keep getting rejected.
                    st.status = CircuitStatus::HalfOpen;
                    st.probe_in_flight = true;
                    st.last_state_change_at = Instant::now();
                    tracing::info!(service = %service, "Circuit half-open, probing recovery");
                    metrics::record_circuit_state(service, CircuitStatus::HalfOpen);
                    true
                } else {
                    false
                }
            }
            CircuitStatus::HalfOpen => {
                if st.probe_in_flight {
                    false
                } else {
                    st.probe_in_flight = true;
                    true
                }
            }
        }
    }

    fn record_success(&self, service: &str) {
        let entry = self.entry(service);
        let mut st = entry.lock().expect("circuit state mutex poisoned");
        match st.status {
            CircuitStatus::Closed => {
                st.consecutive_failures = 0;
            }
            CircuitStatus::HalfOpen => {
                st.status = CircuitStatus::Closed;
                st.consecutive_failures = 0;
                st.probe_in_flight = false;
                st.last_state_change_at = Instant::now();
                tracing::info!(service = %service, "Circuit closed, normal operation resumed");
                metrics::record_circuit_state(service, CircuitStatus::Closed);
            }
            CircuitStatus::Open => {
                // Late success from an orphaned attempt; the cooldown still
                // governs recovery.
            }
        }
    }

    fn record_failure(&self, service: &str) {
        let entry = self.entry(service);
        let mut st = entry.lock().expect("circuit state mutex poisoned");
        st.last_failure_at = Some(Instant::now());
        match st.status {
            CircuitStatus::Closed => {
                st.consecutive_failures = st.consecutive_failures.saturating_add(1);
                if st.consecutive_failures >= self.settings.failure_threshold {
                    st.status = CircuitStatus::Open;
                    st.last_state_change_at = Instant::now();
                    tracing::warn!(
                        service = %service,
                        failures = st.consecutive_failures,
                        "Circuit opened"
                    );
                    metrics::record_circuit_state(service, CircuitStatus::Open);
                }
            }
            CircuitStatus::HalfOpen => {
                st.status = CircuitStatus::Open;
                st.probe_in_flight = false;
                st.last_state_change_at = Instant::now();
                tracing::warn!(service = %service, "Probe failed, circuit reopened");
                metrics::record_circuit_state(service, CircuitStatus::Open);
            }
            CircuitStatus::Open => {
                // Already open; nothing to trip.
            }
        }
    }

    fn state(&self, service: &str) -> CircuitStatus {
        let entry = self.entry(service);
        let st = entry.lock().expect("circuit state mutex poisoned");
        st.status
    }
}
