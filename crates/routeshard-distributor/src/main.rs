//! routeshard Distributor
//!
//! Serves job control and completion callbacks and runs the dispatch loop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use routeshard_core::{BestCostCombiner, ResultCombiner, StrategyRegistry};
use routeshard_distributor::gateway::build_client;
use routeshard_distributor::{
    http, AppState, Config, HttpWorkerGateway, ManagerClient, Scheduler,
};

/// routeshard task distributor.
#[derive(Parser, Debug)]
#[command(name = "routeshard-distributor", about = "routeshard task distributor")]
struct Args {
    /// HTTP server address
    #[arg(long, env = "ROUTESHARD_DISTRIBUTOR_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: String,

    /// Base URL workers use to reach this distributor
    #[arg(long, env = "ROUTESHARD_PUBLIC_URL", default_value = "http://localhost:8080")]
    public_url: String,

    /// Manager base URL
    #[arg(long, env = "ROUTESHARD_MANAGER_URL", default_value = "http://localhost:8081")]
    manager_url: String,

    /// Directory holding uploaded datasets
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Solver artifact sent to workers
    #[arg(long, default_value = "artifacts/solver.bin")]
    artifact: PathBuf,

    /// Manifest naming the strategy
    #[arg(long, default_value = "artifacts/manifest.json")]
    manifest: PathBuf,

    /// Seconds between dispatch ticks
    #[arg(long, default_value = "10")]
    dispatch_interval_secs: u64,

    /// Width of every range
    #[arg(long, default_value = "1000000")]
    chunk_size: u64,

    /// Ranges generated per refill
    #[arg(long, default_value = "10")]
    batch_size: usize,

    /// Outbound request timeout in seconds
    #[arg(long, default_value = "10")]
    request_timeout_secs: u64,

    /// File the best result is written to
    #[arg(long)]
    best_result: Option<PathBuf>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: args.bind_addr,
            public_url: args.public_url,
            manager_url: args.manager_url,
            upload_dir: args.upload_dir,
            artifact_path: args.artifact,
            manifest_path: args.manifest,
            dispatch_interval: Duration::from_secs(args.dispatch_interval_secs.max(1)),
            chunk_size: args.chunk_size.max(1),
            batch_size: args.batch_size.max(1),
            request_timeout: Duration::from_secs(args.request_timeout_secs.max(1)),
            best_result_path: args.best_result,
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

    let client = build_client(config.request_timeout)?;
    let combiner: Arc<dyn ResultCombiner> = match &config.best_result_path {
        Some(path) => Arc::new(BestCostCombiner::with_persistence(path)),
        None => Arc::new(BestCostCombiner::new()),
    };
    let strategies = StrategyRegistry::with_defaults();

    info!(
        manager = %config.manager_url,
        callback = %config.callback_url(),
        strategies = ?strategies.names(),
        "Starting distributor"
    );

    let scheduler = Arc::new(Scheduler::new(
        config.clone(),
        strategies,
        Arc::new(ManagerClient::new(client.clone(), &config.manager_url)),
        Arc::new(HttpWorkerGateway::new(client)),
        combiner,
    ));
    tokio::spawn(scheduler.clone().run());

    let router = http::create_router(AppState::new(scheduler));
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, "Distributor listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
