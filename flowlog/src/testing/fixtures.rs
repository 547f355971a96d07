//! In-memory stand-ins for the engine adapter.

use crate::core::Outcome;
use crate::errors::{FlowlogError, Result};
use crate::graph::{ExecutionGraph, GraphNode, PipelineRun};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A mutable execution graph kept in linearization order.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    nodes: RwLock<Vec<GraphNode>>,
    failing: AtomicBool,
}

impl InMemoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding `nodes`.
    #[must_use]
    pub fn with_nodes(nodes: impl IntoIterator<Item = GraphNode>) -> Self {
        let graph = Self::new();
        for node in nodes {
            graph.upsert(node);
        }
        graph
    }

    /// Replaces the node with the same id, or appends it.
    pub fn upsert(&self, node: GraphNode) {
        let mut nodes = self.nodes.write();
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
    }

    /// Applies `update` to the node with `id`, if present.
    pub fn update(&self, id: &str, update: impl FnOnce(&mut GraphNode)) {
        if let Some(node) = self.nodes.write().iter_mut().find(|n| n.id == id) {
            update(node);
        }
    }

    /// Makes every enumeration fail while `fail` is set.
    pub fn fail_enumeration(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl ExecutionGraph for InMemoryGraph {
    fn nodes(&self) -> Result<Vec<GraphNode>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlowlogError::graph_walk("root", "execution not loaded"));
        }
        Ok(self.nodes.read().clone())
    }
}

#[derive(Debug)]
struct RunState {
    building: bool,
    result: Option<Outcome>,
    duration_millis: u64,
}

/// A pipeline run backed by an [`InMemoryGraph`].
#[derive(Debug)]
pub struct TestRun {
    project: String,
    build_id: String,
    unique_id: String,
    environment: HashMap<String, String>,
    graph: Arc<InMemoryGraph>,
    state: Mutex<RunState>,
}

impl TestRun {
    /// Creates a building run with an empty graph and a random unique id.
    #[must_use]
    pub fn new(project: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            build_id: build_id.into(),
            unique_id: uuid::Uuid::new_v4().to_string(),
            environment: HashMap::new(),
            graph: Arc::new(InMemoryGraph::new()),
            state: Mutex::new(RunState {
                building: true,
                result: None,
                duration_millis: 0,
            }),
        }
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Uses `graph` as the run's execution graph.
    #[must_use]
    pub fn with_graph(mut self, graph: Arc<InMemoryGraph>) -> Self {
        self.graph = graph;
        self
    }

    /// Returns the concrete graph for mutation in tests.
    #[must_use]
    pub fn graph_handle(&self) -> Arc<InMemoryGraph> {
        self.graph.clone()
    }

    /// Marks the run finished with `result` after `duration_millis`.
    pub fn finish(&self, result: Outcome, duration_millis: u64) {
        let mut state = self.state.lock();
        state.building = false;
        state.result = Some(result);
        state.duration_millis = duration_millis;
    }

    /// Sets the building flag.
    pub fn set_building(&self, building: bool) {
        self.state.lock().building = building;
    }
}

impl PipelineRun for TestRun {
    fn project(&self) -> String {
        self.project.clone()
    }

    fn build_id(&self) -> String {
        self.build_id.clone()
    }

    fn unique_id(&self) -> String {
        self.unique_id.clone()
    }

    fn is_building(&self) -> bool {
        self.state.lock().building
    }

    fn result(&self) -> Option<Outcome> {
        self.state.lock().result
    }

    fn duration_millis(&self) -> u64 {
        self.state.lock().duration_millis
    }

    fn graph(&self) -> Arc<dyn ExecutionGraph> {
        self.graph.clone()
    }

    fn environment(&self) -> HashMap<String, String> {
        self.environment.clone()
    }
}
