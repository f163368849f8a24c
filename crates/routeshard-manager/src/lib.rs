//! routeshard Manager Library
//!
//! The manager owns the authoritative set of live workers. Workers register
//! and leave over HTTP; a periodic health sweep probes every worker and
//! evicts the ones that fail to answer.

pub mod config;
pub mod health;
pub mod http;
pub mod metrics;
pub mod probe;
pub mod registry;
pub mod state;

pub use config::{Config, HealthConfig, MAX_CONCURRENT_PROBES};
pub use health::{HealthSweeper, SweepReport};
pub use probe::{HttpProbe, ProbeError, StateProbe};
pub use registry::WorkerRegistry;
pub use state::AppState;
