//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (ordered route lookup)
//!     → matcher.rs (evaluate path template + method)
//!     → Return: matched Route or NoMatch
//!
//! Forwarding:
//!     matched Route
//!     → rewrite.rs (strip/replace prefix, append to backend base path)
//!     → absolute backend URI
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile matchers and rewrite rules
//!     → Reject duplicate pattern + method pairs
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by definition)

pub mod matcher;
pub mod rewrite;
pub mod router;

pub use router::{Route, RouteLookup, RouteTable};

/// Errors raised while compiling the route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid path rewrite '{pattern}': {reason}")]
    InvalidRewrite { pattern: String, reason: String },

    #[error("route '{0}' defines more than one path rewrite")]
    MultipleRewrites(String),

    #[error("invalid header name '{0}'")]
    InvalidHeader(String),

    #[error("duplicate route '{pattern}' for method {method}")]
    Duplicate { pattern: String, method: String },
}
