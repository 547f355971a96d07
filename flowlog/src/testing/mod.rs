//! Testing utilities for flowlog integrations.
//!
//! This module provides:
//! - An in-memory execution graph and pipeline run
//! - Writers that collect documents or fail on demand

mod fixtures;
mod writers;

pub use fixtures::{InMemoryGraph, TestRun};
pub use writers::{CollectingDocumentWriter, FailingDocumentWriter};
