//! Outbound dispatch: rate limiter → circuit breaker → retrying client.
//!
//! The dispatcher is the only component that knows about both rate-limit
//! concerns and circuit-breaker concerns; the two never reference each
//! other. It sequences the admission checks, runs the call, reports the
//! outcome back to the breaker, and translates every result into either a
//! forwardable response or a [`GatewayError`].

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;

use crate::config::RouteClass;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::CircuitBreak;
use crate::resilience::retry::{OutboundCall, Retryer, UpstreamError};
use crate::security::identity::ClientKey;
use crate::security::rate_limit::RateLimit;

/// Everything the dispatcher needs to know about one inbound request.
#[derive(Debug)]
pub struct DispatchRequest {
    pub client: ClientKey,
    pub route_class: RouteClass,
    pub call: OutboundCall,
}

/// Sequences admission and execution for one outbound call.
pub struct Dispatcher {
    limiter: Arc<dyn RateLimit>,
    breaker: Arc<dyn CircuitBreak>,
    retryer: Arc<dyn Retryer>,
    /// Overall deadline covering the whole retry sequence.
    deadline: Duration,
    /// When false, 4xx responses other than 429 do not count against the
    /// circuit.
    count_client_errors: bool,
}

impl Dispatcher {
    pub fn new(
        limiter: Arc<dyn RateLimit>,
        breaker: Arc<dyn CircuitBreak>,
        retryer: Arc<dyn Retryer>,
        deadline: Duration,
        count_client_errors: bool,
    ) -> Self {
        Self {
            limiter,
            breaker,
            retryer,
            deadline,
            count_client_errors,
        }
    }

    /// Run one request through the full admission + execution sequence.
    ///
    /// Downstream responses are returned whatever their status; the caller
    /// forwards them verbatim. Errors cover everything the gateway decides
    /// on its own.
    pub async fn dispatch(&self, req: DispatchRequest) -> Result<Response<Body>, GatewayError> {
        let service = req.call.service.clone();

        let decision = self.limiter.admit(&req.client, req.route_class).await;
        if !decision.allowed {
            metrics::record_rate_limited(req.client.tier, req.route_class);
            return Err(GatewayError::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            });
        }

        if !self.breaker.allow(&service) {
            let state = self.breaker.state(&service);
            tracing::debug!(service = %service, state = %state, "Circuit rejected call");
            return Err(GatewayError::CircuitOpen { service, state });
        }

        // The attempt sequence runs in its own task so a caller-side deadline
        // leaves it running: an abandoned attempt still reports its eventual
        // outcome to the breaker, since a too-slow downstream is evidence of
        // downstream trouble.
        let breaker = Arc::clone(&self.breaker);
        let retryer = Arc::clone(&self.retryer);
        let call = req.call;
        let outcome_service = service.clone();
        let count_client_errors = self.count_client_errors;
        let handle = tokio::spawn(async move {
            let result = retryer.execute(call).await;
            match &result {
                Ok(response) => {
                    let status = response.status();
                    if is_breaker_failure(status.as_u16(), count_client_errors) {
                        breaker.record_failure(&outcome_service);
                    } else {
                        breaker.record_success(&outcome_service);
                    }
                }
                Err(_) => breaker.record_failure(&outcome_service),
            }
            result
        });

        match tokio::time::timeout(self.deadline, handle).await {
            Err(_elapsed) => {
                // Dropping the JoinHandle detaches the task; it keeps running.
                tracing::warn!(service = %service, "Request deadline fired mid-dispatch");
                Err(GatewayError::Timeout { service })
            }
            Ok(Err(join_err)) => {
                // The task died before reporting; count it as a failure so a
                // half-open probe slot is never stranded.
                self.breaker.record_failure(&service);
                tracing::error!(service = %service, error = %join_err, "Dispatch task failed");
                Err(GatewayError::Internal {
                    message: join_err.to_string(),
                })
            }
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(UpstreamError { kind, message }))) => {
                tracing::warn!(service = %service, %kind, %message, "Downstream unreachable");
                Err(GatewayError::Unreachable {
                    service,
                    reason: kind.to_string(),
                })
            }
        }
    }
}

/// Does a final response status count as a circuit failure?
fn is_breaker_failure(status: u16, count_client_errors: bool) -> bool {
    if status < 400 {
        return false;
    }
    if count_client_errors {
        return true;
    }
    // Caller-input 4xx excluded; 429 and every 5xx still count.
    status >= 500 || status == 429
}
