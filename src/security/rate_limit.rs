//! Fixed-window rate limiting.
//!
//! Every client identity gets a counter. Each request increments it and is
//! rejected once the count passes the budget. All counters are zeroed together
//! when the window elapses; there is no per-client expiry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::RateLimitConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

/// Per-client request counters for the current window.
///
/// Increments for one identity are serialized by the map's shard lock, and
/// `reset` takes the same locks, so no increment is lost to a concurrent reset.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    counters: DashMap<String, u64>,
    budget: u64,
    window: Duration,
    trust_forwarded_for: bool,
}

impl FixedWindowLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            counters: DashMap::new(),
            budget: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// Count one request for `identity`. Returns false once the count exceeds the budget.
    pub fn admit(&self, identity: &str) -> bool {
        let mut count = self.counters.entry(identity.to_string()).or_insert(0);
        *count += 1;
        *count <= self.budget
    }

    /// Zero every counter. Entries are kept.
    pub fn reset(&self) {
        self.counters.iter_mut().for_each(|mut entry| *entry.value_mut() = 0);
        tracing::debug!(clients = self.counters.len(), "Rate limit window reset");
    }

    /// Requests counted for `identity` in the current window.
    pub fn count(&self, identity: &str) -> u64 {
        self.counters.get(identity).map_or(0, |c| *c)
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of identities observed since startup.
    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }

    /// Client identity for a request: the peer IP, or the first
    /// `X-Forwarded-For` entry when forwarded headers are trusted.
    pub fn identity(&self, request: &Request<Body>) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(client) = forwarded {
                return client.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Background task zeroing the limiter at every window boundary.
pub struct WindowResetTask {
    handle: JoinHandle<()>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl WindowResetTask {
    /// Start resetting `limiter` every window until stopped or `shutdown` fires.
    pub fn spawn(limiter: Arc<FixedWindowLimiter>, mut shutdown: broadcast::Receiver<()>) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let window = limiter.window();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + window, window);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(window_secs = window.as_secs(), budget = limiter.budget(), "Rate limit window task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => limiter.reset(),
                    _ = &mut stop_rx => break,
                    _ = shutdown.recv() => break,
                }
            }

            tracing::info!("Rate limit window task stopped");
        });

        Self {
            handle,
            stop_tx: Some(stop_tx),
        }
    }

    /// Stop the task and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Rate limit window task failed");
        }
    }
}

/// Middleware admitting requests through the limiter.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = limiter.identity(&request);

    if limiter.admit(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, budget = limiter.budget(), "Rate limit exceeded");
        metrics::record_rate_limited();
        GatewayError::ClientOverBudget { client }.into_response()
    }
}
