//! Per-request deadline enforcement.
//!
//! # Responsibilities
//! - Arm a deadline when a request enters the pipeline
//! - Answer 504 with the gateway envelope if it expires before the response head
//! - Cut off the relayed body if it expires while the body is streaming
//! - Cancel the in-flight backend call by dropping its future or body
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities, one independent timer per request
//! - The deadline branch is polled first, so a fired deadline always wins a tie
//! - The guard returns exactly once, so a client never sees two responses
//! - Once the head has been sent a status can no longer change, so a late
//!   body fails the stream and the connection is closed

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use futures_util::StreamExt;
use tokio::time::Instant;

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::routing::{RouteLookup, RouteTable};

/// Deadline applied to the whole request → backend → response cycle.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    deadline: Duration,
}

impl DeadlineGuard {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Drive `pipeline` to completion or answer with a timeout.
    ///
    /// On expiry `pipeline` is dropped, aborting any backend request it owns.
    /// A response that arrives in time has its body bounded by the same deadline.
    pub async fn guard<F>(&self, pipeline: F) -> Response
    where
        F: Future<Output = Response>,
    {
        let expires_at = Instant::now() + self.deadline;
        let expiry = tokio::time::sleep_until(expires_at);
        tokio::pin!(expiry);
        tokio::pin!(pipeline);

        tokio::select! {
            biased;
            _ = &mut expiry => {
                metrics::record_timeout();
                let mut response =
                    GatewayError::GatewayTimeout { deadline_secs: self.deadline.as_secs() }.into_response();
                response.extensions_mut().insert(TimedOut);
                response
            }
            response = &mut pipeline => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, self.bound_body(body, expires_at))
            }
        }
    }

    /// Fail `body` at `expires_at`, dropping the backend stream it reads from.
    fn bound_body(&self, body: Body, expires_at: Instant) -> Body {
        let deadline_secs = self.deadline.as_secs();
        let state = Some((body.into_data_stream(), Box::pin(tokio::time::sleep_until(expires_at))));

        let stream = futures_util::stream::unfold(state, move |state| async move {
            let (mut data, mut expiry) = state?;
            tokio::select! {
                biased;
                _ = &mut expiry => {
                    metrics::record_timeout();
                    tracing::warn!(deadline_secs, "Request deadline exceeded while streaming body, backend call cancelled");
                    let err = axum::Error::new(GatewayError::GatewayTimeout { deadline_secs });
                    Some((Err(err), None))
                }
                frame = data.next() => frame.map(|frame| (frame, Some((data, expiry)))),
            }
        });
        Body::from_stream(stream)
    }
}

/// Middleware state: the guard plus the route table used to label metrics.
#[derive(Clone)]
pub struct DeadlineState {
    pub guard: Arc<DeadlineGuard>,
    pub routes: Arc<RouteTable>,
}

/// Middleware wrapping the rest of the pipeline in the deadline guard.
pub async fn deadline_middleware(
    State(state): State<DeadlineState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = std::time::Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = state.guard.guard(next.run(request)).await;
    if response.extensions().get::<TimedOut>().is_some() {
        tracing::warn!(
            method = %method,
            path = %path,
            deadline_secs = state.guard.deadline().as_secs(),
            "Request deadline exceeded, backend call cancelled"
        );
        // Dispatch was dropped before it could record the request.
        let route = match state.routes.match_route(&method, &path) {
            RouteLookup::Matched(route) => route.name(),
            RouteLookup::NoMatch { .. } => "none",
        };
        metrics::record_request(method.as_str(), response.status().as_u16(), route, start);
    }
    response
}

/// Response extension marking a gateway-synthesized timeout.
#[derive(Debug, Clone, Copy)]
pub struct TimedOut;
