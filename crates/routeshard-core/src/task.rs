//! Task ranges and completion reports.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::{CoreError, SpaceIndex, WorkerAddr};

/// A half-open slice `[start, end)` of the global search space.
///
/// Identity is `(start, end)` only: the assigned worker is bookkeeping and is
/// never sent over the wire, so a range reported back by any worker matches
/// the pending entry it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRange {
    pub start: SpaceIndex,
    pub end: SpaceIndex,

    /// Where the worker posts its result.
    pub callback_url: String,

    #[serde(skip)]
    pub worker: Option<WorkerAddr>,
}

impl TaskRange {
    /// Create an unassigned range.
    pub fn new(start: SpaceIndex, end: SpaceIndex, callback_url: impl Into<String>) -> Self {
        Self {
            start,
            end,
            callback_url: callback_url.into(),
            worker: None,
        }
    }

    /// Check that the range is well-formed (`start <= end`).
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.start > self.end {
            return Err(CoreError::InvalidRange {
                start: self.start.to_string(),
                end: self.end.to_string(),
            });
        }
        Ok(())
    }

    /// Number of positions covered.
    pub fn width(&self) -> SpaceIndex {
        &self.end - &self.start
    }

    pub fn is_assigned(&self) -> bool {
        self.worker.is_some()
    }

    pub fn assign(&mut self, worker: WorkerAddr) {
        self.worker = Some(worker);
    }

    pub fn unassign(&mut self) {
        self.worker = None;
    }
}

impl PartialEq for TaskRange {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl Eq for TaskRange {}

impl Hash for TaskRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.hash(state);
        self.end.hash(state);
    }
}

impl fmt::Display for TaskRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Body a worker posts to the callback address once a range is solved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    /// Opaque solver output, handed to the result combiner as-is.
    pub result: serde_json::Value,

    /// The range that was solved.
    pub task: TaskRange,
}
