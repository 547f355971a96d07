//! Error types for the flowlog crate.
//!
//! Every failure raised here is telemetry-side. None of them is allowed to
//! reach the pipeline engine: senders log and swallow them, and construction
//! failures degrade to a broken writer.

use thiserror::Error;

/// The main error type for flowlog operations.
#[derive(Debug, Error)]
pub enum FlowlogError {
    /// A document could not be delivered to the backend.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// The writer or run configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The execution graph was in an unexpected state while deriving a node.
    #[error("Graph walk error at node {node_id}: {reason}")]
    GraphWalk {
        /// The node being derived.
        node_id: String,
        /// What was wrong.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowlogError {
    /// Creates a delivery error.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery(message.into())
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a graph walk error for the given node.
    pub fn graph_walk(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GraphWalk {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for backend delivery failures.
    #[must_use]
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

impl From<reqwest::Error> for FlowlogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Delivery(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FlowlogError>;
