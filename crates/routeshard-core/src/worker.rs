//! Worker identity and registry entries.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::WorkerStatus;

const CHECK_STATE_ENDPOINT: &str = "check-state";
const INIT_ENDPOINT: &str = "init";
const SOLVE_ENDPOINT: &str = "solve";
const RESET_ENDPOINT: &str = "reset";

/// Network identity of a worker. Two workers are the same worker iff host
/// and port match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerAddr {
    pub host: String,
    pub port: u16,
}

impl WorkerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL of the worker's HTTP API.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn check_state_url(&self) -> String {
        self.endpoint(CHECK_STATE_ENDPOINT)
    }

    pub fn init_url(&self) -> String {
        self.endpoint(INIT_ENDPOINT)
    }

    pub fn solve_url(&self) -> String {
        self.endpoint(SOLVE_ENDPOINT)
    }

    pub fn reset_url(&self) -> String {
        self.endpoint(RESET_ENDPOINT)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path)
    }
}

impl fmt::Display for WorkerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A registered worker together with its last reported status.
///
/// Equality and hashing only consider the address, so a status change never
/// produces a "different" worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    #[serde(flatten)]
    pub addr: WorkerAddr,

    #[serde(default)]
    pub worker_status: WorkerStatus,
}

impl Worker {
    /// A freshly registered worker, always starting at `UNINITIALIZED`.
    pub fn new(addr: WorkerAddr) -> Self {
        Self {
            addr,
            worker_status: WorkerStatus::Uninitialized,
        }
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: WorkerStatus) -> Self {
        self.worker_status = status;
        self
    }
}

impl PartialEq for Worker {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl Eq for Worker {}

impl Hash for Worker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}
