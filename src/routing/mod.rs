//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (priority-ordered scan)
//!     → matcher.rs (prefix evaluation)
//!     → Return: CompiledRoute (service, base URL, route class) or no match
//!
//! Route compilation (at startup and on config reload):
//!     RouteConfig[] + ServiceConfig[]
//!     → sort by priority, then prefix length
//!     → resolve service base URLs
//!     → freeze as immutable RouteTable
//! ```

pub mod matcher;
pub mod router;

pub use router::{CompiledRoute, RouteTable};
