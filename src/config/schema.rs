//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Ordered route definitions. Order is significant: first match wins.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Boundary hardening (CORS, security headers, body size).
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Client-facing port. Overridden by the `PORT` environment variable.
    pub port: u16,
}

impl ListenerConfig {
    /// The `host:port` pair the gateway listens on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// A single entry of the route table.
///
/// ```toml
/// [[routes]]
/// route = "/user/updateProfile/:id"
/// target = "http://localhost:8080/user/update-profile"
/// method = "PUT"
/// path_rewrite = { "^/user/updateProfile" = "" }
/// headers = ["Authorization"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path template, may contain positional segments such as `:id`.
    pub route: String,

    /// Backend base URL (scheme, host, port and optional base path).
    pub target: String,

    /// HTTP method to match. `None` or `"ANY"` matches every method.
    #[serde(default)]
    pub method: Option<String>,

    /// Anchored prefix rewrites applied before forwarding (`"^/prefix" = "replacement"`).
    #[serde(default)]
    pub path_rewrite: BTreeMap<String, String>,

    /// Inbound headers copied verbatim to the backend (e.g. `Authorization`).
    #[serde(default)]
    pub headers: Vec<String>,
}

impl RouteConfig {
    /// A route entry with no method constraint, rewrite or header policy.
    pub fn new(route: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            target: target.into(),
            method: None,
            path_rewrite: BTreeMap::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_rewrite(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.path_rewrite.insert(pattern.into(), replacement.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.headers.push(name.into());
        self
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request deadline (request → backend → response head) in seconds.
    pub request_secs: u64,

    /// Idle pooled backend connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 15,
            idle_secs: 60,
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in seconds. All counters reset together at this interval.
    pub window_secs: u64,

    /// Maximum admitted requests per client per window.
    pub max_requests: u64,

    /// Key clients by the first `X-Forwarded-For` entry instead of the peer IP.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 20,
            trust_forwarded_for: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add standard security response headers.
    pub enable_headers: bool,
    /// Answer CORS preflights and add CORS response headers.
    pub enable_cors: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            enable_cors: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
