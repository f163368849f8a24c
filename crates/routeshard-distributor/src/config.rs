//! Distributor configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Distributor configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Base URL workers use to reach this distributor.
    pub public_url: String,

    /// Base URL of the manager.
    pub manager_url: String,

    /// Directory holding uploaded datasets.
    pub upload_dir: PathBuf,

    /// Solver artifact sent to workers at init.
    pub artifact_path: PathBuf,

    /// Manifest naming the strategy, sent to workers at init.
    pub manifest_path: PathBuf,

    /// Period between dispatch ticks.
    pub dispatch_interval: Duration,

    /// Width of every generated range.
    pub chunk_size: u64,

    /// Ranges generated per refill.
    pub batch_size: usize,

    /// Deadline for every outbound request.
    pub request_timeout: Duration,

    /// Where the best result is kept, if anywhere.
    pub best_result_path: Option<PathBuf>,
}

impl Config {
    /// Address workers post completion reports to.
    pub fn callback_url(&self) -> String {
        format!("{}/result", self.public_url.trim_end_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            public_url: "http://localhost:8080".to_string(),
            manager_url: "http://localhost:8081".to_string(),
            upload_dir: PathBuf::from("uploads"),
            artifact_path: PathBuf::from("artifacts/solver.bin"),
            manifest_path: PathBuf::from("artifacts/manifest.json"),
            dispatch_interval: Duration::from_secs(10),
            chunk_size: 1_000_000,
            batch_size: 10,
            request_timeout: Duration::from_secs(10),
            best_result_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_url() {
        let mut config = Config::default();
        assert_eq!(config.callback_url(), "http://localhost:8080/result");

        config.public_url = "http://10.0.0.2:9000/".to_string();
        assert_eq!(config.callback_url(), "http://10.0.0.2:9000/result");
    }
}
