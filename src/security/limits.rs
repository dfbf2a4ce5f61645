//! Request body size limit.
//!
//! # Responsibilities
//! - Reject requests whose declared `Content-Length` exceeds the limit
//! - Cut off streamed (chunked) bodies once they pass the limit
//!
//! # Design Decisions
//! - Declared sizes are rejected before the body is read, with the 413 envelope
//! - A streamed overflow fails the body with `GatewayError::PayloadTooLarge`;
//!   dispatch finds it in the client error and answers 413 instead of 502

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::error::GatewayError;

/// Wrap `body` so it fails once more than `limit` bytes have passed.
pub fn limited_body(body: Body, limit: usize) -> Body {
    let mut seen = 0usize;
    let stream = body.into_data_stream().map(move |frame| {
        let chunk = frame?;
        seen = seen.saturating_add(chunk.len());
        if seen > limit {
            return Err(axum::Error::new(GatewayError::PayloadTooLarge { limit }));
        }
        Ok(chunk)
    });
    Body::from_stream(stream)
}

/// Middleware enforcing the configured maximum body size.
pub async fn body_limit_middleware(
    State(limit): State<usize>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if declared.is_some_and(|len| len > limit as u64) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            content_length = declared,
            limit,
            "Request body too large"
        );
        return GatewayError::PayloadTooLarge { limit }.into_response();
    }

    let (parts, body) = request.into_parts();
    next.run(Request::from_parts(parts, limited_body(body, limit))).await
}
