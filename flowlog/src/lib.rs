//! # Flowlog
//!
//! Ships lifecycle and console events of a running pipeline to an
//! Elasticsearch-compatible index, in near real time.
//!
//! Flowlog provides:
//!
//! - **Diffable graph status**: a per-run tracker that reports only the
//!   execution-graph nodes that appeared or changed status since the last poll
//! - **Stream senders**: one sender per build or node stream, emitting start,
//!   message and end documents
//! - **Console cleanup**: embedded console annotations are stripped, or kept
//!   alongside the message
//! - **Non-fatal delivery**: backend failures are logged and never reach the
//!   pipeline engine
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flowlog::prelude::*;
//!
//! let registry = Arc::new(TrackerRegistry::new());
//! let storage = LogStorage::for_build(
//!     run,
//!     &IndexerConfig::from_env()?,
//!     registry,
//!     &DefaultRunIdProvider,
//!     Arc::new(HttpWriterFactory),
//! )?;
//!
//! let mut sender = storage.node_sender("12").await;
//! sender.write(b"compiling\n").await;
//! sender.close().await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod console;
pub mod core;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod runid;
pub mod sender;
pub mod storage;
pub mod testing;
pub mod tracker;
pub mod utils;
pub mod writer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{IndexerConfig, RunConfiguration, RunIdentity, WriterMode};
    pub use crate::console::{Annotation, ConsoleNoteFilter, ParsedLine};
    pub use crate::core::{Document, NodeSnapshot, NodeStatus, Outcome};
    pub use crate::errors::{FlowlogError, Result};
    pub use crate::graph::{BlockKind, ExecutionGraph, GraphNode, NodeContext, NodeError, PipelineRun};
    pub use crate::runid::{DefaultRunIdProvider, JsonRunIdProvider, JsonSource, RunIdProvider};
    pub use crate::sender::{EventSender, EventType, StreamBinding};
    pub use crate::storage::{HttpWriterFactory, LogStorage, WriterFactory};
    pub use crate::tracker::{StatusDiffTracker, TrackerRegistry};
    pub use crate::writer::{BrokenDocumentWriter, DocumentWriter, HttpDocumentWriter};
    pub use std::sync::Arc;
}
