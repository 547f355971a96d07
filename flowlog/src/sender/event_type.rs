//! Wire values of the `eventType` document field.

use super::StreamBinding;
use std::fmt;

/// Kind of document pushed by a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The overall build stream was opened.
    BuildStart,
    /// The overall build stream was closed.
    BuildEnd,
    /// A node stream was opened.
    NodeStart,
    /// A node stream was closed.
    NodeEnd,
    /// A console line of the build stream.
    BuildMessage,
    /// A console line of a node stream.
    NodeMessage,
}

impl EventType {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildStart => "flowGraph::buildStart",
            Self::BuildEnd => "flowGraph::buildEnd",
            Self::NodeStart => "flowGraph::nodeStart",
            Self::NodeEnd => "flowGraph::nodeEnd",
            Self::BuildMessage => "buildMessage",
            Self::NodeMessage => "nodeMessage",
        }
    }

    pub(crate) fn start(binding: &StreamBinding) -> Self {
        match binding {
            StreamBinding::Build { .. } => Self::BuildStart,
            StreamBinding::Node(_) => Self::NodeStart,
        }
    }

    pub(crate) fn end(binding: &StreamBinding) -> Self {
        match binding {
            StreamBinding::Build { .. } => Self::BuildEnd,
            StreamBinding::Node(_) => Self::NodeEnd,
        }
    }

    pub(crate) fn message(binding: &StreamBinding) -> Self {
        match binding {
            StreamBinding::Build { .. } => Self::BuildMessage,
            StreamBinding::Node(_) => Self::NodeMessage,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
