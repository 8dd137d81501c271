//! Inbound traffic control subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → identity.rs (derive client key: user id or source IP)
//!     → rate_limit.rs (fixed-window admission per key + route class)
//!     → store.rs (atomic increment-with-TTL, in-process or external)
//! ```

pub mod identity;
pub mod rate_limit;
pub mod store;

pub use identity::{ClientKey, Tier};
pub use rate_limit::{FixedWindowLimiter, RateLimit, RateLimitDecision};
pub use store::{CounterStore, InMemoryCounterStore};
