//! HTTP API gateway
//!
//! Single entry point for the client application. Requests are matched
//! against a static route table and forwarded to backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ request-id ─▶ trace ─▶ cors ─▶ security headers │
//!                           │       ─▶ rate limit ─▶ body limit ─▶ deadline     │
//!                           │                                      │            │
//!                           │                                      ▼            │
//!                           │                        ┌──────────────────────┐   │
//!                           │                        │ dispatch             │   │
//!                           │                        │  route table lookup  │   │
//!                           │                        │  path rewrite        │   │
//!                           │                        │  header policy       │   │
//!                           │                        └──────────┬───────────┘   │
//!     Client Response       │                                   │               │
//!     ◀─────────────────────┼───────── relay / error envelope ◀─┴──────────────┼──── Backend
//!                           └──────────────────────────────────────────────────┘     Services
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::load_config;
use api_gateway::lifecycle::{shutdown_on_signal, Shutdown};
use api_gateway::observability::{logging, metrics};
use api_gateway::HttpServer;

/// HTTP API gateway.
#[derive(Parser, Debug)]
#[command(name = "api-gateway", version, about)]
struct Args {
    /// Path to the TOML route table and settings.
    #[arg(long, short = 'c', env = "GATEWAY_CONFIG", default_value = "gateway.toml")]
    config: PathBuf,

    /// Listening port; overrides `listener.port`.
    #[arg(long, short = 'p', env = "PORT")]
    port: Option<u16>,

    /// Load and validate the configuration, then exit.
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.listener.port = port;
    }

    if args.validate {
        println!(
            "{}: ok ({} routes)",
            args.config.display(),
            config.routes.len()
        );
        return Ok(());
    }

    logging::init_logging(&config.observability);

    tracing::info!(
        config = %args.config.display(),
        routes = config.routes.len(),
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation has already checked the address.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Gateway is running");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown_on_signal(shutdown);

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
