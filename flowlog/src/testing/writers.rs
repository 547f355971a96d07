//! Document writers for tests.

use crate::core::Document;
use crate::errors::{FlowlogError, Result};
use crate::writer::DocumentWriter;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

/// Records every pushed document.
#[derive(Debug, Default)]
pub struct CollectingDocumentWriter {
    documents: RwLock<Vec<Document>>,
}

impl CollectingDocumentWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected documents.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    /// Returns the `eventType` of every document, in push order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.documents
            .read()
            .iter()
            .map(|d| {
                d.get("eventType")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    /// Returns documents with the given `eventType`.
    #[must_use]
    pub fn documents_of_type(&self, event_type: &str) -> Vec<Document> {
        self.documents
            .read()
            .iter()
            .filter(|d| d.get("eventType").and_then(|v| v.as_str()) == Some(event_type))
            .cloned()
            .collect()
    }

    /// Returns the number of collected documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if nothing was pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Clears all collected documents.
    pub fn clear(&self) {
        self.documents.write().clear();
    }
}

#[async_trait]
impl DocumentWriter for CollectingDocumentWriter {
    async fn push(&self, document: &Document) -> Result<()> {
        self.documents.write().push(document.clone());
        Ok(())
    }
}

/// Fails a configurable number of pushes, then accepts and records documents.
#[derive(Debug, Default)]
pub struct FailingDocumentWriter {
    remaining_failures: Mutex<Option<usize>>,
    attempts: Mutex<usize>,
    accepted: CollectingDocumentWriter,
}

impl FailingDocumentWriter {
    /// Creates a writer whose every push fails.
    #[must_use]
    pub fn always() -> Self {
        Self::default()
    }

    /// Creates a writer whose first `count` pushes fail.
    #[must_use]
    pub fn times(count: usize) -> Self {
        Self {
            remaining_failures: Mutex::new(Some(count)),
            ..Self::default()
        }
    }

    /// Returns the number of push calls, failed or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }

    /// Returns the documents that were accepted.
    #[must_use]
    pub fn accepted(&self) -> &CollectingDocumentWriter {
        &self.accepted
    }
}

#[async_trait]
impl DocumentWriter for FailingDocumentWriter {
    async fn push(&self, document: &Document) -> Result<()> {
        *self.attempts.lock() += 1;
        let fail = {
            let mut remaining = self.remaining_failures.lock();
            match remaining.as_mut() {
                None => true,
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    true
                }
            }
        };
        if fail {
            return Err(FlowlogError::delivery("simulated backend outage"));
        }
        self.accepted.push(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn typed(event_type: &str) -> Document {
        let mut doc = Document::new();
        doc.insert("eventType".to_string(), Value::from(event_type));
        doc
    }

    #[tokio::test]
    async fn test_collecting_writer() {
        let writer = CollectingDocumentWriter::new();
        assert!(writer.is_empty());

        writer.push(&typed("nodeMessage")).await.unwrap();
        writer.push(&typed("flowGraph::nodeEnd")).await.unwrap();

        assert_eq!(writer.event_types(), vec!["nodeMessage", "flowGraph::nodeEnd"]);
        assert_eq!(writer.documents_of_type("nodeMessage").len(), 1);

        writer.clear();
        assert!(writer.is_empty());
    }

    #[tokio::test]
    async fn test_failing_writer_recovers_after_count() {
        let writer = FailingDocumentWriter::times(2);
        assert!(writer.push(&typed("a")).await.is_err());
        assert!(writer.push(&typed("b")).await.is_err());
        assert!(writer.push(&typed("c")).await.is_ok());

        assert_eq!(writer.attempts(), 3);
        assert_eq!(writer.accepted().event_types(), vec!["c"]);
    }

    #[tokio::test]
    async fn test_failing_writer_always() {
        let writer = FailingDocumentWriter::always();
        for _ in 0..3 {
            assert!(writer.push(&typed("a")).await.unwrap_err().is_delivery());
        }
        assert!(writer.accepted().is_empty());
    }
}
