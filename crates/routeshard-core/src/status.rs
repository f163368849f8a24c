//! Worker lifecycle status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Status of a worker as last reported by the worker itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    /// Worker has no dataset loaded and needs an init payload.
    #[default]
    Uninitialized,
    /// Worker is initialized and idle.
    Free,
    /// Worker is solving a task range.
    Working,
}

impl WorkerStatus {
    /// Returns true if the worker can accept a task range.
    pub fn can_accept_tasks(&self) -> bool {
        matches!(self, Self::Free)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Free => "FREE",
            Self::Working => "WORKING",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNINITIALIZED" => Ok(Self::Uninitialized),
            "FREE" => Ok(Self::Free),
            "WORKING" => Ok(Self::Working),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}
