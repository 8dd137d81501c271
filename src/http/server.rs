//! HTTP server setup and the gateway handler.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, body limits, request ID, timeout backstop)
//! - Assemble the dispatcher from config (limiter, breaker, retrying client)
//! - Apply config reloads (route table, rate-limit tiers) without restart
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::dispatch::{DispatchRequest, Dispatcher};
use crate::error::GatewayError;
use crate::http::request::{
    forwarded_headers, propagate_request_id_layer, set_request_id_layer, X_REQUEST_ID,
};
use crate::observability::metrics;
use crate::resilience::{BreakerSettings, CircuitBreakerRegistry, HttpRetryer, RetryPolicy};
use crate::routing::RouteTable;
use crate::security::{identity, FixedWindowLimiter, InMemoryCounterStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    routes: Arc<ArcSwap<RouteTable>>,
    limiter: Arc<FixedWindowLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let routes = Arc::new(ArcSwap::from_pointee(RouteTable::from_config(
            &config.routes,
            &config.services,
        )));

        let store = Arc::new(InMemoryCounterStore::new());
        let limiter = Arc::new(FixedWindowLimiter::new(store, config.rate_limit.clone()));

        let breaker = Arc::new(CircuitBreakerRegistry::new(BreakerSettings {
            failure_threshold: config.circuit_breaker.failure_threshold,
            cooldown: Duration::from_secs(config.circuit_breaker.cooldown_secs),
        }));

        let retryer = Arc::new(HttpRetryer::new(
            RetryPolicy::from_config(&config.retries),
            Duration::from_secs(config.timeouts.connect_secs),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            limiter.clone(),
            breaker,
            retryer,
            Duration::from_secs(config.timeouts.request_secs),
            config.circuit_breaker.count_client_errors,
        ));

        let state = AppState {
            routes: routes.clone(),
            dispatcher,
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            routes,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            // Backstop above the dispatcher's own deadline; the dispatcher
            // normally answers first with a structured 504 body.
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs + 5,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// `config_updates` delivers validated configs from the file watcher;
    /// only the route table and rate-limit tiers are applied live.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.load().len(),
            "HTTP server starting"
        );

        self.spawn_reload_task(config_updates);

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn spawn_reload_task(&self, mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>) {
        let routes = self.routes.clone();
        let limiter = self.limiter.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                let table = RouteTable::from_config(&new_config.routes, &new_config.services);
                tracing::info!(routes = table.len(), "Applying configuration reload");
                routes.store(Arc::new(table));
                limiter.update_settings(new_config.rate_limit);
            }
        });
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Main gateway handler.
/// Matches a route, derives the client key, buffers the body, and hands the
/// call to the dispatcher.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let path = request.uri().path().to_string();
    let query = request.uri().query().map(|q| q.to_string());
    let method = request.method().clone();
    let method_str = method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Gateway request"
    );

    let route = match state.routes.load().match_path(&path) {
        Some(r) => r.clone(),
        None => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_request(&method_str, 404, "none", start_time);
            return GatewayError::RouteNotFound { path }.into_response();
        }
    };

    let client = identity::client_key(request.headers(), addr);

    // Buffer the body so retried attempts can replay it.
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(request_id = %request_id, error = %err, "Request body rejected");
            metrics::record_request(&method_str, 413, &route.service, start_time);
            return GatewayError::BodyTooLarge.into_response();
        }
    };

    let outbound_path = route.outbound_path(&path);
    let uri_str = match &query {
        Some(q) => format!("{}{}?{}", route.base_url, outbound_path, q),
        None => format!("{}{}", route.base_url, outbound_path),
    };
    let uri: Uri = match uri_str.parse() {
        Ok(uri) => uri,
        Err(err) => {
            tracing::error!(request_id = %request_id, uri = %uri_str, error = %err, "Outbound URI invalid");
            metrics::record_request(&method_str, 500, &route.service, start_time);
            return GatewayError::Internal {
                message: "failed to build outbound URI".to_string(),
            }
            .into_response();
        }
    };

    let mut headers = forwarded_headers(&parts.headers);
    if let Ok(value) = header::HeaderValue::from_str(&request_id) {
        headers.insert(X_REQUEST_ID, value);
    }

    let dispatch = DispatchRequest {
        client,
        route_class: route.route_class,
        call: crate::resilience::OutboundCall {
            service: route.service.clone(),
            method,
            uri,
            headers,
            body: body_bytes,
        },
    };

    match state.dispatcher.dispatch(dispatch).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method_str, status.as_u16(), &route.service, start_time);
            response.into_response()
        }
        Err(err) => {
            metrics::record_request(
                &method_str,
                err.status().as_u16(),
                &route.service,
                start_time,
            );
            err.into_response()
        }
    }
}

/// Wait for either Ctrl+C or the coordinated shutdown signal.
async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            }
        }
        _ = shutdown.recv() => {}
    }
    tracing::info!("Shutdown signal received");
}
