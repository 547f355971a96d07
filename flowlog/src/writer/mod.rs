//! Document delivery to the indexing backend.
//!
//! A [`DocumentWriter`] pushes one JSON document per call. Delivery failures
//! come back as [`FlowlogError::Delivery`]; the caller logs and drops them.

mod http;

pub use http::{trust_certificates, HttpDocumentWriter};

use crate::core::Document;
use crate::errors::{FlowlogError, Result};
use async_trait::async_trait;

/// Sink for serialized event documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Pushes a single document.
    async fn push(&self, document: &Document) -> Result<()>;
}

/// Stand-in used when no real writer could be built.
///
/// Every push fails with the construction error, so the failure surfaces in
/// the logs of each sender instead of at pipeline start.
#[derive(Debug, Clone)]
pub struct BrokenDocumentWriter {
    reason: String,
}

impl BrokenDocumentWriter {
    /// Creates a writer that fails with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns why the real writer is unavailable.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<&FlowlogError> for BrokenDocumentWriter {
    fn from(err: &FlowlogError) -> Self {
        Self::new(err.to_string())
    }
}

#[async_trait]
impl DocumentWriter for BrokenDocumentWriter {
    async fn push(&self, _document: &Document) -> Result<()> {
        Err(FlowlogError::delivery(format!(
            "writer unavailable: {}",
            self.reason
        )))
    }
}
