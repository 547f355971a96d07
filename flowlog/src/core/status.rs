//! Node status and run outcome enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The terminal outcome of a run, an interruption or a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Completed without problems.
    Success,
    /// Completed with warnings.
    Unstable,
    /// Failed.
    Failure,
    /// Never ran.
    NotBuilt,
    /// Interrupted by a user or the engine.
    Aborted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Unstable => write!(f, "UNSTABLE"),
            Self::Failure => write!(f, "FAILURE"),
            Self::NotBuilt => write!(f, "NOT_BUILT"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// The observable status of one execution-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// The node is still active.
    Running,
    /// Completed without problems.
    Success,
    /// Completed with warnings.
    Unstable,
    /// Failed.
    Failure,
    /// Never ran.
    NotBuilt,
    /// Interrupted.
    Aborted,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Running
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Unstable => write!(f, "UNSTABLE"),
            Self::Failure => write!(f, "FAILURE"),
            Self::NotBuilt => write!(f, "NOT_BUILT"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

impl From<Outcome> for NodeStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => Self::Success,
            Outcome::Unstable => Self::Unstable,
            Outcome::Failure => Self::Failure,
            Outcome::NotBuilt => Self::NotBuilt,
            Outcome::Aborted => Self::Aborted,
        }
    }
}

impl NodeStatus {
    /// Returns true once the node has left `Running`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}
