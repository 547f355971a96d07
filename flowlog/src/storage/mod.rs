//! Per-run log storage: hands out event senders for the build and its nodes.
//!
//! A [`LogStorage`] is created once per run. It resolves the run
//! configuration, looks up the run's status tracker in the shared
//! [`TrackerRegistry`] and decides whether senders share one writer.


use crate::config::{IndexerConfig, RunConfiguration, WriterMode};
use crate::errors::Result;
use crate::graph::{GraphIndex, NodeContext, PipelineRun};
use crate::runid::RunIdProvider;
use crate::sender::{EventSender, StreamBinding};
use crate::tracker::{StatusDiffTracker, TrackerRegistry};
use crate::writer::{BrokenDocumentWriter, DocumentWriter, HttpDocumentWriter};
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates document writers for a resolved run configuration.
pub trait WriterFactory: Send + Sync {
    /// Builds a writer bound to the run's endpoint.
    fn create(&self, config: &RunConfiguration) -> Result<Arc<dyn DocumentWriter>>;
}

/// Builds [`HttpDocumentWriter`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpWriterFactory;

impl WriterFactory for HttpWriterFactory {
    fn create(&self, config: &RunConfiguration) -> Result<Arc<dyn DocumentWriter>> {
        Ok(Arc::new(HttpDocumentWriter::new(config)?))
    }
}

impl<F> WriterFactory for F
where
    F: Fn(&RunConfiguration) -> Result<Arc<dyn DocumentWriter>> + Send + Sync,
{
    fn create(&self, config: &RunConfiguration) -> Result<Arc<dyn DocumentWriter>> {
        self(config)
    }
}

enum WriterSource {
    Shared(Arc<dyn DocumentWriter>),
    PerSender(Arc<dyn WriterFactory>),
}

/// Entry point used by the engine adapter for one run.
pub struct LogStorage {
    run: Arc<dyn PipelineRun>,
    registry: Arc<TrackerRegistry>,
    config: Arc<RunConfiguration>,
    tracker: Option<Arc<StatusDiffTracker>>,
    writers: WriterSource,
}

impl std::fmt::Debug for LogStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStorage")
            .field("uri", &self.config.uri().as_str())
            .field("tracker", &self.tracker)
            .field(
                "shared_writer",
                &matches!(self.writers, WriterSource::Shared(_)),
            )
            .finish_non_exhaustive()
    }
}

impl LogStorage {
    /// Prepares log storage for `run`.
    ///
    /// While the run is building its tracker is created in `registry` if
    /// absent. A writer that cannot be built is replaced by a
    /// [`BrokenDocumentWriter`]; only an unresolvable run configuration fails.
    pub fn for_build(
        run: Arc<dyn PipelineRun>,
        config: &IndexerConfig,
        registry: Arc<TrackerRegistry>,
        provider: &dyn RunIdProvider,
        factory: Arc<dyn WriterFactory>,
    ) -> Result<Self> {
        let run_config = Arc::new(RunConfiguration::resolve(config, run.as_ref(), provider)?);

        let run_key = run.unique_id();
        let tracker = if run.is_building() {
            Some(registry.get_or_create(&run_key, || run.graph()))
        } else {
            registry.get(&run_key)
        };

        let writers = match config.writer_mode {
            WriterMode::Shared => WriterSource::Shared(build_writer(factory.as_ref(), &run_config)),
            WriterMode::PerSender => WriterSource::PerSender(factory),
        };

        Ok(Self {
            run,
            registry,
            config: run_config,
            tracker,
            writers,
        })
    }

    /// The resolved run configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// The run's status tracker, if the run was building when opened.
    #[must_use]
    pub fn tracker(&self) -> Option<&Arc<StatusDiffTracker>> {
        self.tracker.as_ref()
    }

    /// Opens the sender for the overall build stream.
    ///
    /// Closing it discards the run's tracker.
    pub async fn overall_sender(&self) -> EventSender {
        EventSender::open(
            StreamBinding::build(self.run.clone(), self.registry.clone()),
            self.config.clone(),
            self.tracker.clone(),
            self.writer(),
        )
        .await
    }

    /// Opens the sender for the stream of `node_id`.
    ///
    /// If the node cannot be located in the current graph the sender still
    /// opens, with a context carrying only the node id.
    pub async fn node_sender(&self, node_id: &str) -> EventSender {
        let context = self.node_context(node_id);
        EventSender::open(
            StreamBinding::node(context),
            self.config.clone(),
            self.tracker.clone(),
            self.writer(),
        )
        .await
    }

    fn node_context(&self, node_id: &str) -> NodeContext {
        let nodes = match self.run.graph().nodes() {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(node_id, error = %err, "Cannot enumerate graph for node context");
                return NodeContext::bare(node_id);
            }
        };
        let index = GraphIndex::new(&nodes);
        let Some(node) = index.get(node_id) else {
            debug!(node_id, "Node not in graph yet, using bare context");
            return NodeContext::bare(node_id);
        };
        NodeContext::derive(node, &index).unwrap_or_else(|err| {
            warn!(node_id, error = %err, "Cannot derive node context");
            NodeContext::bare(node_id)
        })
    }

    fn writer(&self) -> Arc<dyn DocumentWriter> {
        match &self.writers {
            WriterSource::Shared(writer) => writer.clone(),
            WriterSource::PerSender(factory) => build_writer(factory.as_ref(), &self.config),
        }
    }
}

fn build_writer(factory: &dyn WriterFactory, config: &RunConfiguration) -> Arc<dyn DocumentWriter> {
    factory.create(config).unwrap_or_else(|err| {
        warn!(uri = %config.uri(), error = %err, "Cannot create document writer, events will be dropped");
        Arc::new(BrokenDocumentWriter::from(&err))
    })
}
