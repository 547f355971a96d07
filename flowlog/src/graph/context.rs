//! Structural context of a node: enclosing stage, parallel branch and agent.

use super::{BlockKind, GraphIndex, GraphNode};
use crate::core::Document;
use crate::errors::{FlowlogError, Result};
use serde_json::Value;
use std::collections::HashSet;

/// Identifying context attached to documents of a node stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeContext {
    /// The node id.
    pub node_id: String,
    /// Step function name.
    pub step_name: Option<String>,
    /// Label of the nearest enclosing stage.
    pub stage_name: Option<String>,
    /// Id of the nearest enclosing stage.
    pub stage_id: Option<String>,
    /// Thread name of the nearest enclosing parallel branch.
    pub parallel_branch_name: Option<String>,
    /// Id of the nearest enclosing parallel branch.
    pub parallel_branch_id: Option<String>,
    /// Label of the nearest enclosing agent scope.
    pub agent_name: Option<String>,
    /// Ids of the node's graph predecessors.
    pub predecessors: Vec<String>,
}

impl NodeContext {
    /// Creates a context carrying only the node id.
    #[must_use]
    pub fn bare(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    /// Derives the context of `node` by walking its enclosing blocks outward.
    ///
    /// The node itself is inspected first, then each enclosing block start up
    /// to the root. For each kind the first labelled block wins.
    pub fn derive(node: &GraphNode, index: &GraphIndex<'_>) -> Result<Self> {
        let mut context = Self {
            node_id: node.id.clone(),
            step_name: node.step_function.clone(),
            predecessors: node.parents.clone(),
            ..Default::default()
        };

        let mut visited = HashSet::new();
        let mut current = Some(node);
        while let Some(block) = current {
            if !visited.insert(block.id.as_str()) {
                return Err(FlowlogError::graph_walk(
                    &node.id,
                    format!("enclosing chain loops back to {}", block.id),
                ));
            }
            context.absorb(block);

            current = match &block.enclosing_id {
                Some(id) => Some(index.get(id).ok_or_else(|| {
                    FlowlogError::graph_walk(&node.id, format!("enclosing block {id} not found"))
                })?),
                None => None,
            };
        }

        Ok(context)
    }

    fn absorb(&mut self, block: &GraphNode) {
        match &block.kind {
            BlockKind::Stage { label } if self.stage_name.is_none() => {
                if let Some(label) = non_empty(label) {
                    self.stage_name = Some(label);
                    self.stage_id = Some(block.id.clone());
                }
            }
            BlockKind::ParallelBranch { thread_name } if self.parallel_branch_name.is_none() => {
                if let Some(name) = non_empty(thread_name) {
                    self.parallel_branch_name = Some(name);
                    self.parallel_branch_id = Some(block.id.clone());
                }
            }
            BlockKind::AgentScope { agent } if self.agent_name.is_none() => {
                self.agent_name = non_empty(agent);
            }
            _ => {}
        }
    }

    /// Writes the context fields into a document.
    pub fn append_to(&self, document: &mut Document) {
        document.insert("node".to_string(), Value::String(self.node_id.clone()));
        let optional = [
            ("step", &self.step_name),
            ("stage", &self.stage_name),
            ("stageId", &self.stage_id),
            ("parallelBranch", &self.parallel_branch_name),
            ("parallelBranchId", &self.parallel_branch_id),
            ("agent", &self.agent_name),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                document.insert(key.to_string(), Value::String(v.clone()));
            }
        }
        if !self.predecessors.is_empty() {
            document.insert(
                "predecessors".to_string(),
                Value::Array(self.predecessors.iter().cloned().map(Value::String).collect()),
            );
        }
    }
}

fn non_empty(label: &Option<String>) -> Option<String> {
    label
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
