//! Per-stream event emission.
//!
//! An [`EventSender`] is opened for the overall build stream or for one node
//! stream. It pushes a start document on open, one message document per
//! completed console line, and an end document on close. Each lifecycle
//! document carries the node snapshots that changed since the last emission.
//!
//! Nothing here reports failure to the caller: delivery errors are logged
//! and the document is dropped.

mod event_type;

pub use event_type::EventType;

use crate::config::RunConfiguration;
use crate::console::{ConsoleNoteFilter, LineBuffer};
use crate::core::{Document, NodeSnapshot};
use crate::graph::{NodeContext, PipelineRun};
use crate::tracker::{StatusDiffTracker, TrackerRegistry};
use crate::writer::DocumentWriter;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a sender's documents describe.
#[derive(Clone)]
pub enum StreamBinding {
    /// The overall build stream.
    Build {
        /// The run being logged.
        run: Arc<dyn PipelineRun>,
        /// Registry owning the run's tracker; the tracker is removed on close.
        registry: Arc<TrackerRegistry>,
        /// Registry key of the run.
        run_key: String,
    },
    /// The stream of one graph node.
    Node(NodeContext),
}

impl StreamBinding {
    /// Binds to the overall stream of `run`.
    #[must_use]
    pub fn build(run: Arc<dyn PipelineRun>, registry: Arc<TrackerRegistry>) -> Self {
        let run_key = run.unique_id();
        Self::Build {
            run,
            registry,
            run_key,
        }
    }

    /// Binds to the stream of one node.
    #[must_use]
    pub fn node(context: NodeContext) -> Self {
        Self::Node(context)
    }

    /// Returns `build` or `node`.
    #[must_use]
    pub fn event_prefix(&self) -> &'static str {
        match self {
            Self::Build { .. } => "build",
            Self::Node(_) => "node",
        }
    }
}

impl std::fmt::Debug for StreamBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build { run_key, .. } => f.debug_struct("Build").field("run_key", run_key).finish(),
            Self::Node(context) => f.debug_tuple("Node").field(&context.node_id).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    End,
}

/// Emits the documents of one stream.
///
/// `close` consumes the sender. Dropping it without closing loses any
/// trailing partial line and logs a warning; registry cleanup happens either
/// way.
pub struct EventSender {
    binding: StreamBinding,
    config: Arc<RunConfiguration>,
    tracker: Option<Arc<StatusDiffTracker>>,
    writer: Arc<dyn DocumentWriter>,
    filter: ConsoleNoteFilter,
    buffer: LineBuffer,
    closed: bool,
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("binding", &self.binding)
            .field("tracker", &self.tracker)
            .field("pending_bytes", &self.buffer.pending_len())
            .finish_non_exhaustive()
    }
}

impl EventSender {
    /// Opens a sender and pushes its start document.
    ///
    /// Without a tracker, lifecycle documents carry no `nodes`.
    pub async fn open(
        binding: StreamBinding,
        config: Arc<RunConfiguration>,
        tracker: Option<Arc<StatusDiffTracker>>,
        writer: Arc<dyn DocumentWriter>,
    ) -> Self {
        let sender = Self {
            filter: ConsoleNoteFilter::new(config.save_annotations()),
            binding,
            config,
            tracker,
            writer,
            buffer: LineBuffer::new(),
            closed: false,
        };
        sender.send_lifecycle(Phase::Start).await;
        sender
    }

    /// Returns what this sender is bound to.
    #[must_use]
    pub fn binding(&self) -> &StreamBinding {
        &self.binding
    }

    /// Feeds console output; every completed line is pushed at once.
    pub async fn write(&mut self, bytes: &[u8]) {
        for line in self.buffer.push(bytes) {
            self.send_line(&line).await;
        }
    }

    /// Flushes the trailing partial line and pushes the end document.
    pub async fn close(mut self) {
        if let Some(rest) = self.buffer.take_remainder() {
            self.send_line(&rest).await;
        }
        self.send_lifecycle(Phase::End).await;
        self.closed = true;
    }

    async fn send_line(&self, raw: &[u8]) {
        let event_type = EventType::message(&self.binding);
        let mut document = self.config.create_document();
        self.filter.parse(raw).apply_to(&mut document);
        document.insert(
            "eventType".to_string(),
            Value::String(event_type.as_str().to_string()),
        );
        if let StreamBinding::Node(context) = &self.binding {
            context.append_to(&mut document);
        }
        self.push(event_type, &document).await;
    }

    async fn send_lifecycle(&self, phase: Phase) {
        let event_type = match phase {
            Phase::Start => EventType::start(&self.binding),
            Phase::End => EventType::end(&self.binding),
        };
        let mut document = self.config.create_document();

        match &self.binding {
            StreamBinding::Build { run, .. } => {
                if let Some(result) = run.result() {
                    document.insert("result".to_string(), Value::String(result.to_string()));
                }
                let duration = run.duration_millis();
                if duration > 0 {
                    document.insert("duration".to_string(), Value::from(duration));
                }
            }
            StreamBinding::Node(context) => context.append_to(&mut document),
        }
        document.insert(
            "eventType".to_string(),
            Value::String(event_type.as_str().to_string()),
        );

        let nodes = self.lifecycle_nodes(phase);
        if !nodes.is_empty() {
            document.insert(
                "nodes".to_string(),
                Value::Array(nodes.iter().map(NodeSnapshot::to_value).collect()),
            );
        }

        self.push(event_type, &document).await;
    }

    fn lifecycle_nodes(&self, phase: Phase) -> Vec<NodeSnapshot> {
        let Some(tracker) = &self.tracker else {
            return Vec::new();
        };
        match (&self.binding, phase) {
            (StreamBinding::Node(_), _) => tracker.compute_updated_snapshots(),
            (StreamBinding::Build { .. }, Phase::Start) => Vec::new(),
            (StreamBinding::Build { .. }, Phase::End) => tracker.compute_all_snapshots(),
        }
    }

    async fn push(&self, event_type: EventType, document: &Document) {
        debug!(event_type = %event_type, document = ?document, "Sending document");
        if let Err(err) = self.writer.push(document).await {
            warn!(
                event_type = %event_type,
                error = %err,
                "Failed to push document, dropping it"
            );
        }
    }
}

impl Drop for EventSender {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                stream = ?self.binding,
                pending_bytes = self.buffer.pending_len(),
                "Event sender dropped without close"
            );
        }
        if let StreamBinding::Build {
            registry, run_key, ..
        } = &self.binding
        {
            registry.remove(run_key);
        }
    }
}
