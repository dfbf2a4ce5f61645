//! Response handling and transformation.
//!
//! # Responsibilities
//! - Render gateway-synthesized responses as the JSON envelope
//! - Relay backend responses with hop-by-hop headers stripped
//!
//! # Design Decisions
//! - Backend bodies are streamed, never buffered
//! - Backend status codes are passed through untranslated

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Response as HttpResponse, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hyper::body::Incoming;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Headers that describe a single transport hop and must not be forwarded.
pub static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// `{code, status, message, data}` body used for every gateway-synthesized response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    pub status: EnvelopeStatus,
    pub message: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeStatus {
    Success,
    Error,
}

impl Envelope {
    /// An error envelope whose `code` mirrors the HTTP status.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            status: EnvelopeStatus::Error,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Remove hop-by-hop headers, including any named by the `Connection` header.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }
}

/// Relay a backend response to the client: status and body untouched,
/// hop-by-hop headers removed.
pub fn relay(response: HttpResponse<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
