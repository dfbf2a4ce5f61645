//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every route and report each broken one
//! - Validate value ranges (windows, budgets, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::routing::{Route, RouteError, RouteTable};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid {field} '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("routes[{index}] ({route}): {source}")]
    Route {
        index: usize,
        route: String,
        #[source]
        source: RouteError,
    },

    #[error("route table: {0}")]
    Table(#[source] RouteError),
}

/// Check a loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive = [
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.max_requests", config.rate_limit.max_requests),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "security.max_body_size" });
    }

    let format = config.observability.log_format.to_ascii_lowercase();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::InvalidValue {
            field: "observability.log_format",
            value: config.observability.log_format.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidValue {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let mut routes_ok = true;
    for (index, route) in config.routes.iter().enumerate() {
        if let Err(source) = Route::from_config(route) {
            routes_ok = false;
            errors.push(ValidationError::Route {
                index,
                route: route.route.clone(),
                source,
            });
        }
    }

    // Table-level checks (duplicates) only make sense once every route compiles.
    if routes_ok {
        if let Err(e) = RouteTable::from_config(&config.routes) {
            errors.push(ValidationError::Table(e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
