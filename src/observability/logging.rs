//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level when set
//! - Request ID appears as a field on every request-scoped event

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `default_level` applies when `RUST_LOG` is unset. Calling this twice
/// panics (tracing allows one global subscriber), so it runs once in main.
pub fn init(default_level: &str) {
    let fallback = format!("edge_gateway={default_level},tower_http=warn");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
