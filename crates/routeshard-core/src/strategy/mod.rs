//! The solving capability.
//!
//! A `SearchStrategy` knows how big a dataset's search space is and how to
//! solve one slice of it. Strategies are compiled in and looked up by the
//! name a job's manifest carries, so neither the distributor nor the worker
//! care how a strategy is implemented.

mod combine;
mod tour;

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::SpaceIndex;

pub use combine::{BestCostCombiner, CombineOutcome};
pub use tour::BruteForceTour;

/// Errors raised by strategies and result combiners.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// No strategy registered under this name.
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Dataset bytes could not be interpreted by the strategy.
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// A solver result is missing required fields.
    #[error("Invalid result: {0}")]
    InvalidResult(String),

    /// A range is too wide to enumerate in one call.
    #[error("Range too wide: {0}")]
    RangeTooWide(String),

    /// Persisting a result failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pluggable solving routine over a dataset's search space.
pub trait SearchStrategy: Send + Sync {
    /// Name the strategy is registered under.
    fn name(&self) -> &str;

    /// Total number of positions in the dataset's search space.
    fn space_size(&self, dataset: &[u8]) -> Result<SpaceIndex, StrategyError>;

    /// Solve positions `[start, end)` and return an opaque outcome.
    fn solve_chunk(
        &self,
        dataset: &[u8],
        start: &SpaceIndex,
        end: &SpaceIndex,
    ) -> Result<serde_json::Value, StrategyError>;
}

/// Reduces chunk outcomes into a job-wide answer.
pub trait ResultCombiner: Send + Sync {
    /// Fold one outcome into the running answer.
    fn combine(&self, result: &serde_json::Value) -> Result<CombineOutcome, StrategyError>;

    /// Best answer seen so far.
    fn best(&self) -> Option<serde_json::Value>;

    /// Forget the running answer before a new job.
    fn reset(&self);
}

/// Name-keyed set of compiled-in strategies.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn SearchStrategy>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every built-in strategy.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BruteForceTour));
        registry
    }

    /// Add a strategy, replacing any previous one with the same name.
    pub fn register(&mut self, strategy: Arc<dyn SearchStrategy>) {
        self.strategies
            .insert(strategy.name().to_string(), strategy);
    }

    /// Look up a strategy by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn SearchStrategy>, StrategyError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| StrategyError::UnknownStrategy(name.to_string()))
    }

    /// Registered strategy names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}
