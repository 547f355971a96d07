//! Core data model: node statuses, snapshots and the document type.

mod snapshot;
mod status;

pub use snapshot::NodeSnapshot;
pub use status::{NodeStatus, Outcome};

/// One flat JSON object pushed to the indexing backend.
pub type Document = serde_json::Map<String, serde_json::Value>;
