//! Diffable status tracking for one execution graph.
//!
//! The tracker remembers the last snapshot of every node it has seen and, on
//! each poll, reports only the nodes that are new or whose status changed.
//! Payload size therefore follows the number of changes, not graph width.

mod registry;

pub use registry::TrackerRegistry;

use crate::core::NodeSnapshot;
use crate::graph::{ExecutionGraph, GraphIndex};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct TrackerState {
    /// Stored snapshots in first-seen order.
    entries: Vec<NodeSnapshot>,
    /// Node id to position in `entries`.
    positions: HashMap<String, usize>,
}

/// Status tracker shared by every sender of one execution.
pub struct StatusDiffTracker {
    graph: Arc<dyn ExecutionGraph>,
    state: Mutex<TrackerState>,
}

impl std::fmt::Debug for StatusDiffTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusDiffTracker")
            .field("tracked_nodes", &self.len())
            .finish()
    }
}

impl StatusDiffTracker {
    /// Creates an empty tracker over the given graph.
    #[must_use]
    pub fn new(graph: Arc<dyn ExecutionGraph>) -> Self {
        Self {
            graph,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Walks the current graph and returns the nodes that are new or changed status.
    ///
    /// Nodes whose status is unchanged only get their duration and error
    /// message refreshed. Nodes already in a terminal status are frozen.
    pub fn compute_updated_snapshots(&self) -> Vec<NodeSnapshot> {
        let mut state = self.state.lock();
        self.update(&mut state)
    }

    /// Refreshes the tracker, then returns every stored snapshot.
    ///
    /// Snapshots are ordered by the numeric value of their id. If any id is
    /// not a digit string, first-seen order is kept instead.
    pub fn compute_all_snapshots(&self) -> Vec<NodeSnapshot> {
        let mut state = self.state.lock();
        self.update(&mut state);

        let mut all = state.entries.clone();
        if all.iter().all(|s| is_numeric_id(&s.node_id)) {
            all.sort_by(|a, b| compare_numeric_ids(&a.node_id, &b.node_id));
        }
        all
    }

    /// Returns the stored snapshot of a node.
    #[must_use]
    pub fn snapshot(&self, node_id: &str) -> Option<NodeSnapshot> {
        let state = self.state.lock();
        state
            .positions
            .get(node_id)
            .map(|&pos| state.entries[pos].clone())
    }

    /// Returns the number of tracked nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if no node has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    fn update(&self, state: &mut TrackerState) -> Vec<NodeSnapshot> {
        let nodes = match self.graph.nodes() {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(error = %err, "Failed to enumerate execution graph");
                return Vec::new();
            }
        };
        let index = GraphIndex::new(&nodes);

        let mut updated = Vec::new();
        for node in &nodes {
            let fresh = match index.snapshot(node) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(node_id = %node.id, error = %err, "Skipping node for this poll");
                    continue;
                }
            };

            match state.positions.get(&fresh.node_id) {
                None => {
                    state
                        .positions
                        .insert(fresh.node_id.clone(), state.entries.len());
                    state.entries.push(fresh.clone());
                    updated.push(fresh);
                }
                Some(&pos) => {
                    let stored = &mut state.entries[pos];
                    if stored.status.is_terminal() {
                        continue;
                    }
                    if stored.status == fresh.status {
                        stored.refresh_from(&fresh);
                    } else {
                        *stored = fresh.clone();
                        updated.push(fresh);
                    }
                }
            }
        }

        debug!(
            walked = nodes.len(),
            updated = updated.len(),
            "Computed node status delta"
        );
        updated
    }
}

/// Returns true if `id` is a non-empty string of ASCII digits.
#[must_use]
pub fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Compares two digit strings by numeric value, without overflow.
#[must_use]
pub fn compare_numeric_ids(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeStatus;
    use crate::graph::{GraphNode, NodeError};
    use crate::testing::InMemoryGraph;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn ids(snapshots: &[NodeSnapshot]) -> Vec<&str> {
        snapshots.iter().map(|s| s.node_id.as_str()).collect()
    }

    fn tracker_over(graph: &Arc<InMemoryGraph>) -> StatusDiffTracker {
        StatusDiffTracker::new(graph.clone())
    }

    #[test]
    fn test_three_tick_scenario() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);

        graph.upsert(GraphNode::new("2", "A"));
        assert_eq!(ids(&tracker.compute_updated_snapshots()), vec!["2"]);

        graph.upsert(GraphNode::new("3", "B"));
        assert_eq!(ids(&tracker.compute_updated_snapshots()), vec!["3"]);

        graph.upsert(GraphNode::new("2", "A").finished());
        graph.upsert(GraphNode::new("4", "C"));
        let delta = tracker.compute_updated_snapshots();
        assert_eq!(ids(&delta), vec!["2", "4"]);
        assert_eq!(delta[0].status, NodeStatus::Success);
        assert_eq!(delta[1].status, NodeStatus::Running);
    }

    #[test]
    fn test_unchanged_status_reported_once() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);
        graph.upsert(GraphNode::new("2", "A").with_timing(100, 10));

        assert_eq!(tracker.compute_updated_snapshots().len(), 1);
        graph.upsert(GraphNode::new("2", "A").with_timing(100, 20));
        assert!(tracker.compute_updated_snapshots().is_empty());
        assert!(tracker.compute_updated_snapshots().is_empty());

        // the duration keeps moving even though nothing is reported
        assert_eq!(tracker.snapshot("2").unwrap().duration_millis, 20);
    }

    #[test]
    fn test_terminal_status_does_not_flap() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);
        graph.upsert(
            GraphNode::new("2", "A")
                .finished()
                .with_error(NodeError::failure("exit 1"))
                .with_timing(0, 30),
        );
        let first = tracker.compute_updated_snapshots();
        assert_eq!(first[0].status, NodeStatus::Failure);

        // the engine reports the node as active again with a new duration
        graph.upsert(GraphNode::new("2", "A").with_timing(0, 90));
        assert!(tracker.compute_updated_snapshots().is_empty());

        let stored = tracker.snapshot("2").unwrap();
        assert_eq!(stored, first[0]);
        assert_eq!(tracker.compute_all_snapshots(), vec![first[0].clone()]);
    }

    #[test]
    fn test_all_snapshots_numeric_order() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);
        graph.upsert(GraphNode::new("2", "two"));
        graph.upsert(GraphNode::new("10", "ten"));
        graph.upsert(GraphNode::new("1", "one"));

        assert_eq!(ids(&tracker.compute_all_snapshots()), vec!["1", "2", "10"]);
    }

    #[test]
    fn test_all_snapshots_non_numeric_keeps_insertion_order() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);
        graph.upsert(GraphNode::new("10", "ten"));
        graph.upsert(GraphNode::new("b-2", "two"));
        graph.upsert(GraphNode::new("1", "one"));

        assert_eq!(
            ids(&tracker.compute_all_snapshots()),
            vec!["10", "b-2", "1"]
        );
    }

    #[test]
    fn test_all_snapshots_includes_fresh_nodes() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);
        graph.upsert(GraphNode::new("2", "A"));
        tracker.compute_updated_snapshots();
        graph.upsert(GraphNode::new("3", "B"));

        assert_eq!(tracker.compute_all_snapshots().len(), 2);
        // compute_all consumed the change
        assert!(tracker.compute_updated_snapshots().is_empty());
    }

    #[test]
    fn test_broken_node_skipped_for_one_tick() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);
        graph.upsert(GraphNode::new("2", "A"));
        graph.upsert(GraphNode::new("4", "orphan").enclosed_by("3"));

        assert_eq!(ids(&tracker.compute_updated_snapshots()), vec!["2"]);

        graph.upsert(GraphNode::new("3", "block").enclosed_by("2"));
        assert_eq!(ids(&tracker.compute_updated_snapshots()), vec!["4", "3"]);
    }

    #[test]
    fn test_graph_failure_yields_empty_delta() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = tracker_over(&graph);
        graph.upsert(GraphNode::new("2", "A"));
        graph.fail_enumeration(true);

        assert!(tracker.compute_updated_snapshots().is_empty());
        assert!(tracker.is_empty());

        graph.fail_enumeration(false);
        assert_eq!(tracker.compute_updated_snapshots().len(), 1);
    }

    #[test]
    fn test_concurrent_callers_see_each_change_once() {
        let graph = Arc::new(InMemoryGraph::new());
        let tracker = Arc::new(tracker_over(&graph));
        for i in 1..=50 {
            graph.upsert(GraphNode::new(i.to_string(), format!("node {i}")));
        }
        assert_eq!(tracker.compute_updated_snapshots().len(), 50);

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let graph = graph.clone();
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    for i in 1..=50 {
                        if i % 4 == worker {
                            graph.upsert(
                                GraphNode::new(i.to_string(), format!("node {i}")).finished(),
                            );
                        }
                        seen.extend(
                            tracker
                                .compute_updated_snapshots()
                                .into_iter()
                                .map(|s| (s.node_id, s.status)),
                        );
                    }
                    seen
                })
            })
            .collect();

        let mut reported = Vec::new();
        for handle in handles {
            reported.extend(handle.join().unwrap());
        }
        reported.extend(
            tracker
                .compute_updated_snapshots()
                .into_iter()
                .map(|s| (s.node_id, s.status)),
        );

        let unique: HashSet<_> = reported.iter().cloned().collect();
        assert_eq!(unique.len(), reported.len(), "a status was reported twice");
        assert_eq!(reported.len(), 50);
        assert!(reported.iter().all(|(_, status)| *status == NodeStatus::Success));
        assert!(tracker
            .compute_all_snapshots()
            .iter()
            .all(|s| s.status == NodeStatus::Success));
    }

    #[test]
    fn test_compare_numeric_ids() {
        assert_eq!(compare_numeric_ids("2", "10"), Ordering::Less);
        assert_eq!(compare_numeric_ids("10", "9"), Ordering::Greater);
        assert_eq!(compare_numeric_ids("007", "7"), Ordering::Equal);
        assert_eq!(
            compare_numeric_ids("99999999999999999999999", "100000000000000000000000"),
            Ordering::Less
        );
        assert!(is_numeric_id("42"));
        assert!(!is_numeric_id(""));
        assert!(!is_numeric_id("4a"));
    }
}
