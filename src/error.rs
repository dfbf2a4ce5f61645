//! Gateway-originated failures.
//!
//! Only failures produced by the gateway itself are rendered as envelopes.
//! Backend responses of any status are relayed untouched and never become a
//! `GatewayError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::http::response::Envelope;

/// Marker value reported when no route candidate exists for an unmatched path.
pub const TARGET_NOT_DEFINED: &str = "not defined";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("rate limit exceeded for client {client}")]
    ClientOverBudget { client: String },

    #[error("deadline of {deadline_secs}s exceeded")]
    GatewayTimeout { deadline_secs: u64 },

    #[error("backend {backend} unreachable: {source}")]
    BackendUnreachable {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("no route for {method} {path}")]
    RouteNotFound {
        method: String,
        path: String,
        candidate: Option<String>,
    },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Find a gateway error carried inside another error's source chain.
    ///
    /// Body streams report failures through the HTTP client, which wraps them.
    pub fn find_in<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a GatewayError> {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<GatewayError>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::ClientOverBudget { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Never includes the underlying error text.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::ClientOverBudget { .. } => "Rate limit exceeded.",
            GatewayError::GatewayTimeout { .. } => "Gateway timeout.",
            GatewayError::BackendUnreachable { .. } => "Bad gateway.",
            GatewayError::RouteNotFound { .. } => "Route not found.",
            GatewayError::PayloadTooLarge { .. } => "Payload too large.",
            GatewayError::Internal(_) => "Internal server error.",
        }
    }

    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::ClientOverBudget { .. } => "over_budget",
            GatewayError::GatewayTimeout { .. } => "timeout",
            GatewayError::BackendUnreachable { .. } => "unreachable",
            GatewayError::RouteNotFound { .. } => "not_found",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::Internal(_) => "internal",
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        let envelope = Envelope::error(self.status_code(), self.public_message());
        match self {
            GatewayError::RouteNotFound { method, path, candidate } => envelope.with_data(json!({
                "method": method,
                "path": path,
                "target": candidate.as_deref().unwrap_or(TARGET_NOT_DEFINED),
            })),
            _ => envelope,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.to_envelope().into_response()
    }
}
