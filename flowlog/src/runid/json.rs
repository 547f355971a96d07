//! Run ids from a JSON template with environment expansion.

use super::RunIdProvider;
use crate::errors::{FlowlogError, Result};
use crate::graph::PipelineRun;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::warn;

#[allow(clippy::expect_used)]
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("variable pattern is valid")
});

/// Where the JSON template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonSource {
    /// An inline JSON string.
    String(String),
    /// A JSON file read on every resolution.
    File(PathBuf),
}

impl JsonSource {
    /// Returns the raw JSON text.
    ///
    /// An unreadable file yields `{}`.
    #[must_use]
    pub fn json(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::File(path) => std::fs::read_to_string(path).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "Failed to read run id template");
                "{}".to_string()
            }),
        }
    }

    /// Parses the template as a JSON object.
    pub fn json_object(&self) -> Result<Value> {
        let value: Value = serde_json::from_str(&self.json())?;
        if value.is_object() {
            Ok(value)
        } else {
            Err(FlowlogError::configuration(
                "run id template must be a JSON object",
            ))
        }
    }
}

/// Builds the run id from a JSON template.
///
/// Every string value, at any depth, has `${NAME}` and `$NAME` replaced from
/// the run environment plus `instanceId`.
#[derive(Debug, Clone)]
pub struct JsonRunIdProvider {
    source: JsonSource,
}

impl JsonRunIdProvider {
    /// Creates a provider reading from `source`.
    #[must_use]
    pub fn new(source: JsonSource) -> Self {
        Self { source }
    }

    /// Returns the template source.
    #[must_use]
    pub fn source(&self) -> &JsonSource {
        &self.source
    }
}

impl RunIdProvider for JsonRunIdProvider {
    fn run_id(&self, run: &dyn PipelineRun, instance_id: &str) -> Result<Value> {
        let mut value = self.source.json_object()?;
        let mut env = run.environment();
        env.insert("instanceId".to_string(), instance_id.to_string());
        expand_variables(&mut value, &env);
        Ok(value)
    }
}

/// Recursively expands variables in every string of `value`.
///
/// Unknown variables are left as written.
pub fn expand_variables(value: &mut Value, env: &HashMap<String, String>) {
    match value {
        Value::String(s) => {
            let expanded = VARIABLE
                .replace_all(s.as_str(), |caps: &Captures<'_>| {
                    let name = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map_or("", |m| m.as_str());
                    env.get(name)
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            *s = expanded;
        }
        Value::Array(items) => items.iter_mut().for_each(|item| expand_variables(item, env)),
        Value::Object(map) => map.values_mut().for_each(|item| expand_variables(item, env)),
        _ => {}
    }
}
