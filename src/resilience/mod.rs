//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted by the rate limiter:
//!     → timeouts.rs (arm deadline, race it against dispatch)
//!     → On expiry: 504 envelope, backend future dropped
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every forwarded request has a deadline
//! - No retries: a failed backend call surfaces immediately

pub mod timeouts;

pub use timeouts::{deadline_middleware, DeadlineGuard, DeadlineState};
