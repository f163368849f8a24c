//! routeshard Worker Daemon

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use routeshard_core::{StrategyRegistry, WorkerAddr};

mod config;
mod executor;
mod http;
mod state;

use config::Config;
use executor::{Executor, HttpReportSink};
use state::WorkerState;

/// routeshard worker daemon.
#[derive(Parser, Debug)]
#[command(name = "routeshard-worker", about = "routeshard worker daemon")]
struct Args {
    /// HTTP server address
    #[arg(long, env = "ROUTESHARD_WORKER_ADDR", default_value = "0.0.0.0:8085")]
    bind_addr: String,

    /// Host other services use to reach this worker
    #[arg(long, env = "ROUTESHARD_WORKER_HOST", default_value = "localhost")]
    advertise_host: String,

    /// Port other services use to reach this worker (defaults to the bind port)
    #[arg(long)]
    advertise_port: Option<u16>,

    /// Manager base URL
    #[arg(long, env = "ROUTESHARD_MANAGER_URL", default_value = "http://localhost:8081")]
    manager_url: String,

    /// Directory init files are written to
    #[arg(long, default_value = "worker-data")]
    work_dir: PathBuf,

    /// Outbound request timeout in seconds
    #[arg(long, default_value = "10")]
    request_timeout_secs: u64,
}

impl Args {
    fn into_config(self, bind: SocketAddr) -> Config {
        Config {
            bind_addr: self.bind_addr,
            advertise: WorkerAddr::new(self.advertise_host, self.advertise_port.unwrap_or(bind.port())),
            manager_url: self.manager_url.trim_end_matches('/').to_string(),
            work_dir: self.work_dir,
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..Config::default()
        }
    }
}

/// Register with the manager, retrying until it answers.
async fn register(client: &Client, config: &Config) {
    let url = format!("{}/worker-register", config.manager_url);
    loop {
        let outcome = client
            .post(&url)
            .json(&config.advertise)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match outcome {
            Ok(_) => {
                info!(worker = %config.advertise, manager = %config.manager_url, "Registered");
                return;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    delay_secs = config.register_retry_delay.as_secs(),
                    "Registration failed, retrying"
                );
                tokio::time::sleep(config.register_retry_delay).await;
            }
        }
    }
}

/// Tell the manager this worker is leaving. Best-effort.
async fn leave(client: &Client, config: &Config) {
    let url = format!("{}/worker-leave", config.manager_url);
    match client.post(&url).json(&config.advertise).send().await {
        Ok(_) => info!(worker = %config.advertise, "Left manager"),
        Err(e) => warn!(error = %e, "Could not deregister"),
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

    let args = Args::parse();
    let bind: SocketAddr = args.bind_addr.parse()?;
    let config = args.into_config(bind);

    let client = Client::builder().timeout(config.request_timeout).build()?;
    let worker = Arc::new(WorkerState::new());
    let executor = Arc::new(Executor::new(
        worker.clone(),
        Arc::new(HttpReportSink::new(client.clone())),
    ));
    let state = Arc::new(http::AppState {
        worker,
        executor,
        strategies: StrategyRegistry::with_defaults(),
        work_dir: config.work_dir.clone(),
    });

    let listener = TcpListener::bind(config.bind_addr.as_str()).await?;
    info!(addr = %config.bind_addr, advertise = %config.advertise, "Worker listening");

    let registration = {
        let client = client.clone();
        let config = config.clone();
        tokio::spawn(async move { register(&client, &config).await })
    };

    axum::serve(listener, http::create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    registration.abort();
    leave(&client, &config).await;

    Ok(())
}
