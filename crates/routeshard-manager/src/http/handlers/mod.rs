//! HTTP request handlers.

mod health;
mod workers;

pub use health::{health_check, metrics_handler};
pub use workers::{leave_worker, list_workers, register_worker};
