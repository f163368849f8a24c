//! HTTP request handlers.

mod health;
mod job;
mod result;

pub use health::{health_check, metrics_handler};
pub use job::{job_status, start_job};
pub use result::receive_result;
