//! HTTP edge gateway with resilience-first traffic control.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  EDGE GATEWAY                     │
//!                       │                                                   │
//!   Client Request      │  ┌─────────┐   ┌──────────┐   ┌──────────────┐  │
//!   ────────────────────┼─▶│  http   │──▶│ routing  │──▶│   dispatch   │  │
//!                       │  │ server  │   │  table   │   │              │  │
//!                       │  └─────────┘   └──────────┘   └──────┬───────┘  │
//!                       │                                       │          │
//!                       │            ┌──────────────────────────┼───────┐  │
//!                       │            │  1. rate limiter (security)      │  │
//!                       │            │  2. circuit breaker (resilience) │  │
//!                       │            │  3. retrying client (resilience) │  │
//!                       │            └──────────────────────────┬───────┘  │
//!                       │                                       ▼          │
//!   Client Response     │  ┌─────────┐                  ┌──────────────┐  │
//!   ◀───────────────────┼──│response │◀─────────────────│  downstream  │◀─┼── Downstream
//!                       │  │ / error │                  │     call     │  │    Service
//!                       │  └─────────┘                  └──────────────┘  │
//!                       │                                                   │
//!                       │  Cross-cutting: config (hot reload), lifecycle,   │
//!                       │  observability (tracing + Prometheus metrics)     │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! Downstream responses are forwarded verbatim, whatever their status. Every
//! failure the gateway decides on its own carries a stable machine-readable
//! error code; see [`error::GatewayError`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
