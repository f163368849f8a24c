//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use routeshard_core::WorkerAddr;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Address the manager and distributor use to reach this worker.
    pub advertise: WorkerAddr,

    /// Manager base URL.
    pub manager_url: String,

    /// Directory init files are written to.
    pub work_dir: PathBuf,

    /// Deadline for outbound requests.
    pub request_timeout: Duration,

    /// Delay between registration attempts.
    pub register_retry_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8085".to_string(),
            advertise: WorkerAddr::new("localhost", 8085),
            manager_url: "http://localhost:8081".to_string(),
            work_dir: PathBuf::from("worker-data"),
            request_timeout: Duration::from_secs(10),
            register_retry_delay: Duration::from_secs(5),
        }
    }
}
