//! routeshard CLI - Command line interface for the distributor and manager.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use reqwest::Client;

use routeshard_core::{ApiBody, Worker};

/// routeshard CLI - Job and worker management tool
#[derive(Parser)]
#[command(name = "routeshard")]
#[command(about = "CLI for routeshard", long_about = None)]
struct Cli {
    /// Distributor address
    #[arg(short, long, env = "ROUTESHARD_DISTRIBUTOR_URL", default_value = "http://localhost:8080")]
    distributor: String,

    /// Manager address
    #[arg(short, long, env = "ROUTESHARD_MANAGER_URL", default_value = "http://localhost:8081")]
    manager: String,

    /// Request timeout in seconds
    #[arg(long, env = "ROUTESHARD_TIMEOUT_SECS", default_value = "10")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start a job over a dataset in the distributor's upload directory
    Start {
        /// Dataset file name
        dataset: String,
    },

    /// List live workers
    Workers,

    /// Show progress of the active job
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::builder().timeout(cli.request_timeout()).build()?;
    let distributor = cli.distributor.trim_end_matches('/');
    let manager = cli.manager.trim_end_matches('/');

    match cli.command {
        Commands::Start { dataset } => {
            start(&client, distributor, &dataset).await?;
        }
        Commands::Workers => {
            list_workers(&client, manager).await?;
        }
        Commands::Status => {
            status(&client, distributor).await?;
        }
    }

    Ok(())
}

async fn start(
    client: &Client,
    distributor: &str,
    dataset: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let body: ApiBody = client
        .get(format!("{distributor}/start"))
        .query(&[("zipName", dataset)])
        .send()
        .await?
        .json()
        .await?;

    if body.status_code != 200 {
        return Err(format!("{} ({})", body.message, body.status_code).into());
    }

    println!("{}", body.message);
    if let Some(data) = body.data {
        println!("  Job:        {}", field(&data, "jobId"));
        println!("  Strategy:   {}", field(&data, "strategy"));
        println!("  Space size: {}", field(&data, "finalBoundary"));
    }

    Ok(())
}

async fn list_workers(client: &Client, manager: &str) -> Result<(), Box<dyn std::error::Error>> {
    let body: ApiBody<Vec<Worker>> = client
        .get(format!("{manager}/get-workers"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let workers = body.data.unwrap_or_default();

    println!("Workers ({}):", workers.len());
    println!("{:<32}  {}", "ADDRESS", "STATUS");
    println!("{}", "-".repeat(48));

    for worker in workers {
        println!("{:<32}  {}", worker.addr.to_string(), worker.worker_status);
    }

    Ok(())
}

async fn status(client: &Client, distributor: &str) -> Result<(), Box<dyn std::error::Error>> {
    let body: ApiBody = client
        .get(format!("{distributor}/status"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let Some(data) = body.data else {
        println!("{}", body.message);
        return Ok(());
    };

    println!("  Job:        {}", field(&data, "jobId"));
    println!("  Dataset:    {}", field(&data, "dataset"));
    println!("  Strategy:   {}", field(&data, "strategy"));
    println!("  Started:    {}", format_timestamp(&field(&data, "startedAt")));
    println!(
        "  Cursor:     {} / {}",
        field(&data, "cursor"),
        field(&data, "finalBoundary")
    );
    println!(
        "  Ranges:     {} pending, {} assigned",
        field(&data, "pending"),
        field(&data, "assigned")
    );
    if let Some(best) = data.get("bestResult") {
        println!("  Best:       {best}");
    }

    Ok(())
}

fn field(data: &serde_json::Value, key: &str) -> String {
    match data.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}

fn format_timestamp(raw: &str) -> String {
    raw.parse::<DateTime<Utc>>()
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
