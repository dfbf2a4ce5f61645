//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (CORS preflight, security response headers)
//!     → rate_limit.rs (per-client fixed-window budget)
//!     → limits.rs (request body size)
//!     → Pass to deadline guard and dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: over-budget requests never reach a backend
//! - Exactly one admission check per request

pub mod headers;
pub mod limits;
pub mod rate_limit;

pub use limits::body_limit_middleware;
pub use rate_limit::{rate_limit_middleware, FixedWindowLimiter, WindowResetTask};
