//! HTTP API gateway library.
//!
//! A single public entry point that matches requests against a static
//! route table and forwards them to backend services, with per-client
//! rate limiting and a per-request deadline.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
