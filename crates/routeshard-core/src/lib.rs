//! routeshard Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Runtime specifics
//!
//! All types here represent the core business domain of routeshard: workers,
//! task ranges over the search space, and the solving capability that
//! workers and the distributor share.

pub mod api;
pub mod error;
pub mod ids;
pub mod index;
pub mod manifest;
pub mod status;
pub mod strategy;
pub mod task;
pub mod worker;

// Re-export commonly used types
pub use api::ApiBody;
pub use error::CoreError;
pub use ids::JobId;
pub use index::SpaceIndex;
pub use manifest::Manifest;
pub use status::WorkerStatus;
pub use strategy::{
    BestCostCombiner, CombineOutcome, ResultCombiner, SearchStrategy, StrategyError,
    StrategyRegistry,
};
pub use task::{CompletionReport, TaskRange};
pub use worker::{Worker, WorkerAddr};
