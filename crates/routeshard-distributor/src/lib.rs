//! routeshard Distributor Library
//!
//! The distributor owns a job's search space. It slices the space into
//! ranges, hands ranges to FREE workers on a fixed period, takes ranges back
//! from workers that vanish, and folds completion callbacks into a running
//! best result until the final range reports in.

pub mod completion;
pub mod config;
pub mod gateway;
pub mod http;
pub mod job;
pub mod metrics;
pub mod partitioner;
pub mod scheduler;
pub mod state;

pub use completion::{CompletionError, CompletionOutcome};
pub use config::Config;
pub use gateway::{GatewayError, HttpWorkerGateway, ManagerClient, WorkerGateway, WorkerSource};
pub use job::{InitBundle, Job, JobError, JobStatus};
pub use partitioner::Partitioner;
pub use scheduler::{Scheduler, SchedulerStats, TickReport};
pub use state::AppState;
