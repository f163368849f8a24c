//! routeshard Manager
//!
//! Serves the worker registry and runs the failure detector.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use routeshard_manager::{
    http, AppState, Config, HealthConfig, HealthSweeper, HttpProbe, WorkerRegistry,
    MAX_CONCURRENT_PROBES,
};

/// routeshard worker registry and failure detector.
#[derive(Parser, Debug)]
#[command(name = "routeshard-manager", about = "routeshard worker registry")]
struct Args {
    /// HTTP server address
    #[arg(long, env = "ROUTESHARD_MANAGER_ADDR", default_value = "0.0.0.0:8081")]
    bind_addr: String,

    /// Seconds between health sweeps
    #[arg(long, default_value = "5")]
    sweep_interval_secs: u64,

    /// Per-worker probe deadline in milliseconds
    #[arg(long, default_value = "3000")]
    probe_timeout_ms: u64,

    /// Milliseconds a sweep may run before unfinished probes are cancelled
    #[arg(long, default_value = "5000")]
    sweep_window_ms: u64,

    /// Maximum probes in flight at once (capped at 10)
    #[arg(long, default_value = "10")]
    max_concurrent_probes: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: args.bind_addr,
            health: HealthConfig {
                sweep_interval: Duration::from_secs(args.sweep_interval_secs.max(1)),
                probe_timeout: Duration::from_millis(args.probe_timeout_ms),
                sweep_window: Duration::from_millis(args.sweep_window_ms),
                max_concurrent_probes: args.max_concurrent_probes.clamp(1, MAX_CONCURRENT_PROBES),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("routeshard=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with_target(true)
        .init();

    let config: Config = Args::parse().into();
    let addr: SocketAddr = config.bind_addr.parse()?;

    let registry = Arc::new(WorkerRegistry::new());
    let probe = Arc::new(HttpProbe::new(config.health.probe_timeout)?);
    let sweeper = Arc::new(HealthSweeper::new(
        registry.clone(),
        probe,
        config.health.clone(),
    ));
    tokio::spawn(sweeper.run());

    let router = http::create_router(AppState::new(registry));
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, "Manager listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
