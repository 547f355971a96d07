//! Per-run resolved configuration.

use super::IndexerConfig;
use crate::core::Document;
use crate::errors::Result;
use crate::graph::PipelineRun;
use crate::runid::RunIdProvider;
use crate::utils::{millis_timestamp, now_utc};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

/// Identifying fields stamped on every document of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunIdentity {
    /// Full project name.
    pub project: String,
    /// Build id.
    pub build: String,
    /// Engine instance id.
    pub instance: String,
    /// Provider-derived run id object.
    pub run_id: Value,
    /// Unique id of the run.
    pub uid: String,
}

/// Configuration resolved for one run, with credentials and trust material inlined.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    uri: Url,
    username: Option<String>,
    password: Option<String>,
    trust_store: Option<Vec<u8>>,
    save_annotations: bool,
    timeout: Duration,
    identity: RunIdentity,
}

impl RunConfiguration {
    /// Creates a configuration for `uri` with no credentials.
    #[must_use]
    pub fn new(uri: Url, identity: RunIdentity) -> Self {
        Self {
            uri,
            username: None,
            password: None,
            trust_store: None,
            save_annotations: false,
            timeout: Duration::from_secs(30),
            identity,
        }
    }

    /// Resolves the deployment configuration for one run.
    pub fn resolve(
        config: &IndexerConfig,
        run: &dyn PipelineRun,
        provider: &dyn RunIdProvider,
    ) -> Result<Self> {
        let identity = RunIdentity {
            project: run.project(),
            build: run.build_id(),
            instance: config.instance_id.clone(),
            run_id: provider.run_id(run, &config.instance_id)?,
            uid: run.unique_id(),
        };
        Ok(Self {
            uri: config.uri()?,
            username: config.username.clone(),
            password: config.password.clone(),
            trust_store: if config.ssl {
                config.trust_store.clone()
            } else {
                None
            },
            save_annotations: config.save_annotations,
            timeout: config.timeout()?,
            identity,
        })
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the PKCS#12 trust store bytes.
    #[must_use]
    pub fn with_trust_store(mut self, bytes: Vec<u8>) -> Self {
        self.trust_store = Some(bytes);
        self
    }

    /// Enables annotation preservation.
    #[must_use]
    pub fn with_save_annotations(mut self, save: bool) -> Self {
        self.save_annotations = save;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The endpoint documents are posted to.
    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Basic-auth user name.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Basic-auth password.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// PKCS#12 trust store bytes.
    #[must_use]
    pub fn trust_store(&self) -> Option<&[u8]> {
        self.trust_store.as_deref()
    }

    /// Whether console annotations are kept.
    #[must_use]
    pub fn save_annotations(&self) -> bool {
        self.save_annotations
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The run's identifying fields.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Starts a new document stamped with the current time and run identity.
    #[must_use]
    pub fn create_document(&self) -> Document {
        let now = now_utc();
        let mut doc = Document::new();
        doc.insert("timestamp".to_string(), Value::String(millis_timestamp(&now)));
        doc.insert("timestampMillis".to_string(), Value::from(now.timestamp_millis()));
        doc.insert("project".to_string(), Value::String(self.identity.project.clone()));
        doc.insert("build".to_string(), Value::String(self.identity.build.clone()));
        doc.insert("instance".to_string(), Value::String(self.identity.instance.clone()));
        doc.insert("runId".to_string(), self.identity.run_id.clone());
        doc.insert("uid".to_string(), Value::String(self.identity.uid.clone()));
        doc
    }
}
