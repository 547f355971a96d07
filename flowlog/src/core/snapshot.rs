//! Point-in-time capture of one execution-graph node.

use super::NodeStatus;
use serde::{Deserialize, Serialize};

/// The observable state of a single graph node at one poll.
///
/// Serializes to the element shape of a document's `nodes` list. Optional
/// fields are omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    /// Engine-assigned node id.
    #[serde(rename = "id")]
    pub node_id: String,
    /// Step function name, for step nodes.
    #[serde(rename = "step", skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    /// Id of the structurally enclosing block start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing_id: Option<String>,
    /// Label of the enclosing stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
    /// Node id of the enclosing stage block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    /// Thread name of the enclosing parallel branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_branch_name: Option<String>,
    /// Node id of the enclosing parallel branch block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_branch_id: Option<String>,
    /// Human readable node name.
    pub display_name: String,
    /// Current status.
    pub status: NodeStatus,
    /// Elapsed time in milliseconds.
    #[serde(rename = "duration")]
    pub duration_millis: i64,
    /// Start time in epoch milliseconds.
    pub start_time_millis: i64,
    /// Error message of a failed or interrupted node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Label of the enclosing agent scope. Shipped as node context, not in `nodes`.
    #[serde(skip)]
    pub agent_name: Option<String>,
}

impl NodeSnapshot {
    /// Creates a running snapshot with only the mandatory fields set.
    #[must_use]
    pub fn new(node_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            step_name: None,
            enclosing_id: None,
            stage_name: None,
            stage_id: None,
            parallel_branch_name: None,
            parallel_branch_id: None,
            display_name: display_name.into(),
            status: NodeStatus::Running,
            duration_millis: 0,
            start_time_millis: 0,
            error_message: None,
            agent_name: None,
        }
    }

    /// Returns the JSON object shipped in a document's `nodes` list.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Refreshes the fields that move while the status stays the same.
    pub(crate) fn refresh_from(&mut self, fresh: &Self) {
        self.duration_millis = fresh.duration_millis;
        self.error_message.clone_from(&fresh.error_message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_minimal_snapshot_wire_shape() {
        let snapshot = NodeSnapshot::new("3", "Shell Script");
        assert_eq!(
            snapshot.to_value(),
            json!({
                "id": "3",
                "displayName": "Shell Script",
                "status": "RUNNING",
                "duration": 0,
                "startTimeMillis": 0,
            })
        );
    }

    #[test]
    fn test_full_snapshot_wire_shape() {
        let snapshot = NodeSnapshot {
            step_name: Some("sh".to_string()),
            enclosing_id: Some("7".to_string()),
            stage_name: Some("Build".to_string()),
            stage_id: Some("5".to_string()),
            parallel_branch_name: Some("linux".to_string()),
            parallel_branch_id: Some("6".to_string()),
            status: NodeStatus::Failure,
            duration_millis: 1200,
            start_time_millis: 1_700_000_000_000,
            error_message: Some("script returned exit code 1".to_string()),
            agent_name: Some("worker-1".to_string()),
            ..NodeSnapshot::new("9", "Shell Script")
        };

        assert_eq!(
            snapshot.to_value(),
            json!({
                "id": "9",
                "step": "sh",
                "enclosingId": "7",
                "stageName": "Build",
                "stageId": "5",
                "parallelBranchName": "linux",
                "parallelBranchId": "6",
                "displayName": "Shell Script",
                "status": "FAILURE",
                "duration": 1200,
                "startTimeMillis": 1_700_000_000_000_i64,
                "errorMessage": "script returned exit code 1",
            })
        );
    }

    #[test]
    fn test_refresh_keeps_identity() {
        let mut stored = NodeSnapshot::new("4", "Sleep");
        let fresh = NodeSnapshot {
            duration_millis: 500,
            error_message: Some("late".to_string()),
            display_name: "Renamed".to_string(),
            ..NodeSnapshot::new("4", "Sleep")
        };
        stored.refresh_from(&fresh);
        assert_eq!(stored.duration_millis, 500);
        assert_eq!(stored.error_message.as_deref(), Some("late"));
        assert_eq!(stored.display_name, "Sleep");
    }
}
