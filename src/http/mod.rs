//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assignment and propagation)
//!     → dispatch.rs (route lookup, rewrite, forward to backend)
//!     → response.rs (relay backend response, error envelopes)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::{Dispatcher, ProxyResponse};
pub use request::{MakeGatewayRequestId, RequestIdExt, X_REQUEST_ID};
pub use response::{Envelope, EnvelopeStatus};
pub use server::HttpServer;
