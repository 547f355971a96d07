//! Read-only view of the orchestration engine's execution graph.
//!
//! The engine owns the live graph. Its adapter hands out owned
//! [`GraphNode`] values, already classified into a [`BlockKind`], so nothing
//! in this crate keeps references into engine state between polls.

mod context;

pub use context::NodeContext;

use crate::core::{NodeSnapshot, NodeStatus, Outcome};
use crate::errors::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Classification of a block-start node, produced once by the engine adapter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BlockKind {
    /// A labelled stage block.
    Stage {
        /// The stage label, if the engine attached one.
        label: Option<String>,
    },
    /// One branch of a parallel block.
    ParallelBranch {
        /// The branch thread name, if the engine attached one.
        thread_name: Option<String>,
    },
    /// A scope bound to an execution host.
    AgentScope {
        /// The agent label, if the engine attached one.
        agent: Option<String>,
    },
    /// Anything else.
    #[default]
    Other,
}

/// Error annotation carried by a finished node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeError {
    /// The error message, if any.
    pub message: Option<String>,
    /// Declared outcome when the cause was a user-requested interruption.
    pub interruption: Option<Outcome>,
}

impl NodeError {
    /// An ordinary failure with a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            interruption: None,
        }
    }

    /// An interruption with the given declared outcome.
    #[must_use]
    pub fn interrupted(outcome: Outcome) -> Self {
        Self {
            message: None,
            interruption: Some(outcome),
        }
    }
}

/// One node of the execution graph as seen at walk time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphNode {
    /// Engine-assigned id, unique within the execution.
    pub id: String,
    /// Human readable name.
    pub display_name: String,
    /// Step function name for step nodes.
    pub step_function: Option<String>,
    /// Block classification.
    pub kind: BlockKind,
    /// Id of the structurally enclosing block start.
    pub enclosing_id: Option<String>,
    /// Ids of the graph predecessors.
    pub parents: Vec<String>,
    /// Start time in epoch milliseconds.
    pub start_time_millis: i64,
    /// Elapsed time in milliseconds.
    pub duration_millis: i64,
    /// Whether the node is still executing.
    pub active: bool,
    /// Error annotation.
    pub error: Option<NodeError>,
    /// Outcome declared by a non-fatal warning annotation.
    pub warning: Option<Outcome>,
}

impl GraphNode {
    /// Creates an active node with the given id and display name.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            active: true,
            ..Default::default()
        }
    }

    /// Sets the step function name.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step_function = Some(step.into());
        self
    }

    /// Sets the block classification.
    #[must_use]
    pub fn with_kind(mut self, kind: BlockKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the enclosing block id.
    #[must_use]
    pub fn enclosed_by(mut self, enclosing_id: impl Into<String>) -> Self {
        self.enclosing_id = Some(enclosing_id.into());
        self
    }

    /// Sets the graph predecessor ids.
    #[must_use]
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the timing fields.
    #[must_use]
    pub fn with_timing(mut self, start_time_millis: i64, duration_millis: i64) -> Self {
        self.start_time_millis = start_time_millis;
        self.duration_millis = duration_millis;
        self
    }

    /// Marks the node as finished.
    #[must_use]
    pub fn finished(mut self) -> Self {
        self.active = false;
        self
    }

    /// Attaches an error annotation.
    #[must_use]
    pub fn with_error(mut self, error: NodeError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches a warning annotation.
    #[must_use]
    pub fn with_warning(mut self, outcome: Outcome) -> Self {
        self.warning = Some(outcome);
        self
    }

    /// Derives the node status.
    ///
    /// Evaluated as a priority chain: active, then error (interruption before
    /// plain failure), then warning, then success. A finished block may still
    /// carry annotations propagated from its children, so the order matters.
    #[must_use]
    pub fn status(&self) -> NodeStatus {
        if self.active {
            return NodeStatus::Running;
        }
        if let Some(error) = &self.error {
            return error
                .interruption
                .map_or(NodeStatus::Failure, NodeStatus::from);
        }
        if let Some(outcome) = self.warning {
            return outcome.into();
        }
        NodeStatus::Success
    }

    /// Returns the error message, if an error annotation carries one.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }
}

/// The engine-side enumeration of the current graph.
pub trait ExecutionGraph: Send + Sync {
    /// Returns every node reachable from the execution root.
    fn nodes(&self) -> Result<Vec<GraphNode>>;
}

/// The engine-side handle on one pipeline run.
pub trait PipelineRun: Send + Sync {
    /// Full project (job) name.
    fn project(&self) -> String;

    /// Build id within the project.
    fn build_id(&self) -> String;

    /// Stable unique id of this run, used to key the tracker registry.
    fn unique_id(&self) -> String;

    /// Whether the run is still executing.
    fn is_building(&self) -> bool;

    /// Terminal result, once known.
    fn result(&self) -> Option<Outcome>;

    /// Elapsed run time in milliseconds.
    fn duration_millis(&self) -> u64;

    /// The run's execution graph.
    fn graph(&self) -> Arc<dyn ExecutionGraph>;

    /// Environment variables visible to the run.
    fn environment(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Id lookup over one linearization of the graph.
#[derive(Debug)]
pub struct GraphIndex<'a> {
    nodes: HashMap<&'a str, &'a GraphNode>,
}

impl<'a> GraphIndex<'a> {
    /// Indexes a linearization by node id.
    #[must_use]
    pub fn new(nodes: &'a [GraphNode]) -> Self {
        Self {
            nodes: nodes.iter().map(|n| (n.id.as_str(), n)).collect(),
        }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a GraphNode> {
        self.nodes.get(id).copied()
    }

    /// Returns the number of indexed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builds a fresh snapshot of `node`.
    pub fn snapshot(&self, node: &GraphNode) -> Result<NodeSnapshot> {
        let context = NodeContext::derive(node, self)?;
        Ok(NodeSnapshot {
            node_id: node.id.clone(),
            step_name: node.step_function.clone(),
            enclosing_id: node.enclosing_id.clone(),
            stage_name: context.stage_name,
            stage_id: context.stage_id,
            parallel_branch_name: context.parallel_branch_name,
            parallel_branch_id: context.parallel_branch_id,
            display_name: node.display_name.clone(),
            status: node.status(),
            duration_millis: node.duration_millis,
            start_time_millis: node.start_time_millis,
            error_message: node.error_message().map(String::from),
            agent_name: context.agent_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_beats_error() {
        let node = GraphNode::new("3", "sh").with_error(NodeError::failure("boom"));
        assert_eq!(node.status(), NodeStatus::Running);
    }

    #[test]
    fn test_interruption_uses_declared_outcome() {
        let node = GraphNode::new("3", "sh")
            .finished()
            .with_error(NodeError::interrupted(Outcome::Aborted))
            .with_warning(Outcome::Unstable);
        assert_eq!(node.status(), NodeStatus::Aborted);
    }

    #[test]
    fn test_error_beats_warning() {
        let node = GraphNode::new("3", "sh")
            .finished()
            .with_error(NodeError::failure("exit code 2"))
            .with_warning(Outcome::Unstable);
        assert_eq!(node.status(), NodeStatus::Failure);
        assert_eq!(node.error_message(), Some("exit code 2"));
    }

    #[test]
    fn test_warning_and_default() {
        let warned = GraphNode::new("3", "sh")
            .finished()
            .with_warning(Outcome::Unstable);
        assert_eq!(warned.status(), NodeStatus::Unstable);

        let clean = GraphNode::new("4", "echo").finished();
        assert_eq!(clean.status(), NodeStatus::Success);
    }

    #[test]
    fn test_snapshot_copies_fields() {
        let nodes = vec![
            GraphNode::new("2", "Start of Pipeline"),
            GraphNode::new("3", "Shell Script")
                .with_step("sh")
                .enclosed_by("2")
                .with_timing(1000, 250),
        ];
        let index = GraphIndex::new(&nodes);
        let snapshot = index.snapshot(&nodes[1]).unwrap();

        assert_eq!(snapshot.node_id, "3");
        assert_eq!(snapshot.step_name.as_deref(), Some("sh"));
        assert_eq!(snapshot.enclosing_id.as_deref(), Some("2"));
        assert_eq!(snapshot.start_time_millis, 1000);
        assert_eq!(snapshot.duration_millis, 250);
        assert_eq!(snapshot.status, NodeStatus::Running);
    }
}
