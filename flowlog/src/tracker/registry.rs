//! Registry of live trackers, keyed by unique run id.

use super::StatusDiffTracker;
use crate::graph::ExecutionGraph;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Thread-safe registry holding one tracker per executing run.
///
/// Trackers are inserted when a run's log storage is first opened and
/// removed when the overall build stream closes.
#[derive(Debug, Default)]
pub struct TrackerRegistry {
    trackers: DashMap<String, Arc<StatusDiffTracker>>,
}

impl TrackerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tracker for `run_key`, creating it over `graph` if absent.
    pub fn get_or_create(
        &self,
        run_key: &str,
        graph: impl FnOnce() -> Arc<dyn ExecutionGraph>,
    ) -> Arc<StatusDiffTracker> {
        self.trackers
            .entry(run_key.to_string())
            .or_insert_with(|| {
                info!(run_key, "Creating node status tracker");
                Arc::new(StatusDiffTracker::new(graph()))
            })
            .clone()
    }

    /// Gets the tracker for a run.
    #[must_use]
    pub fn get(&self, run_key: &str) -> Option<Arc<StatusDiffTracker>> {
        self.trackers.get(run_key).map(|t| t.clone())
    }

    /// Discards the tracker of a finished run.
    pub fn remove(&self, run_key: &str) -> Option<Arc<StatusDiffTracker>> {
        let removed = self.trackers.remove(run_key).map(|(_, t)| t);
        if removed.is_some() {
            info!(run_key, "Removed node status tracker");
        }
        removed
    }

    /// Returns the number of live trackers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    /// Returns true if no tracker is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryGraph;

    fn graph() -> Arc<dyn ExecutionGraph> {
        Arc::new(InMemoryGraph::new())
    }

    #[test]
    fn test_get_or_create_is_lazy_and_shared() {
        let registry = TrackerRegistry::new();
        assert!(registry.get("run-1").is_none());

        let first = registry.get_or_create("run-1", graph);
        let second = registry.get_or_create("run-1", || panic!("graph requested twice"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let registry = TrackerRegistry::new();
        registry.get_or_create("run-1", graph);
        registry.get_or_create("run-2", graph);

        assert!(registry.remove("run-1").is_some());
        assert!(registry.remove("run-1").is_none());
        assert!(registry.get("run-2").is_some());
        assert_eq!(registry.len(), 1);
    }
}
