//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all dispatch handler
//! - Wire up middleware (request ID, access log, CORS, security headers,
//!   body limit, rate limit, deadline)
//! - Own the rate limiter's window reset task for the server's lifetime
//! - Serve until the shutdown signal, then drain
//!
//! # Middleware Order (outermost first)
//! ```text
//! request-id → trace → cors → security headers → rate limit
//!     → body limit → deadline → dispatch
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::GatewayConfig;
use crate::http::dispatch::Dispatcher;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::resilience::{deadline_middleware, DeadlineGuard, DeadlineState};
use crate::routing::{RouteError, RouteTable};
use crate::security::headers::{cors_layer, security_headers_middleware};
use crate::security::{body_limit_middleware, rate_limit_middleware, FixedWindowLimiter, WindowResetTask};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<FixedWindowLimiter>,
}

impl HttpServer {
    /// Compile the route table and build the middleware stack.
    pub fn new(config: GatewayConfig) -> Result<Self, RouteError> {
        let routes = Arc::new(RouteTable::from_config(&config.routes)?);
        let dispatcher = Dispatcher::new(routes.clone(), &config.timeouts);
        let limiter = Arc::new(FixedWindowLimiter::new(&config.rate_limit));
        let deadline = DeadlineState {
            guard: Arc::new(DeadlineGuard::new(Duration::from_secs(config.timeouts.request_secs))),
            routes,
        };

        let state = AppState { dispatcher };
        let router = Self::build_router(&config, state, limiter.clone(), deadline);

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        limiter: Arc<FixedWindowLimiter>,
        deadline: DeadlineState,
    ) -> Router {
        let mut router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(deadline, deadline_middleware))
            .layer(middleware::from_fn_with_state(
                config.security.max_body_size,
                body_limit_middleware,
            ));

        if config.rate_limit.enabled {
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        if config.security.enable_headers {
            router = router.layer(middleware::from_fn(security_headers_middleware));
        }
        if config.security.enable_cors {
            router = router.layer(cors_layer());
        }

        router.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(propagate_request_id_layer())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = %request.request_id(),
                            )
                        })
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                ),
        )
    }

    /// Run the server until `shutdown` fires, then let in-flight requests finish.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        let reset_task = self
            .config
            .rate_limit
            .enabled
            .then(|| WindowResetTask::spawn(self.limiter.clone(), shutdown.resubscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Some(task) = reset_task {
            task.stop().await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The rate limiter shared with the middleware.
    pub fn rate_limiter(&self) -> Arc<FixedWindowLimiter> {
        self.limiter.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Catch-all handler: every path and method goes through the dispatcher.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.dispatch(request).await.into_response()
}
