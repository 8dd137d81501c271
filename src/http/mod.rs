//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, gateway handler)
//!     → request.rs (request ID, forwarded-header selection)
//!     → [routing layer matches a service]
//!     → [dispatch layer runs admission + retries]
//!     → response.rs (error rendering) or verbatim downstream response
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeUuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
