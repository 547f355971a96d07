//! Run id providers.
//!
//! Every run must be uniquely identifiable in the index. The default id is
//! built from project, build and instance; a JSON template lets deployments
//! without a stable project/build naming supply their own shape.

mod json;

pub use json::{expand_variables, JsonRunIdProvider, JsonSource};

use crate::errors::Result;
use crate::graph::PipelineRun;
use serde_json::{json, Value};

/// Strategy deriving the `runId` object of a run.
pub trait RunIdProvider: Send + Sync {
    /// Returns the run id for `run` on the instance `instance_id`.
    fn run_id(&self, run: &dyn PipelineRun, instance_id: &str) -> Result<Value>;
}

/// Uses full project name, build id and instance id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRunIdProvider;

impl RunIdProvider for DefaultRunIdProvider {
    fn run_id(&self, run: &dyn PipelineRun, instance_id: &str) -> Result<Value> {
        Ok(json!({
            "project": run.project(),
            "build": run.build_id(),
            "instance": instance_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRun;

    #[test]
    fn test_default_run_id() {
        let run = TestRun::new("folder/app", "42");
        let id = DefaultRunIdProvider.run_id(&run, "ci-east").unwrap();
        assert_eq!(
            id,
            json!({"project": "folder/app", "build": "42", "instance": "ci-east"})
        );
    }
}
