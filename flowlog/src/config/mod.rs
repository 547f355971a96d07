//! Indexer configuration.
//!
//! [`IndexerConfig`] is the deployment-level setting (endpoint, credentials,
//! trust material). [`RunConfiguration`] is its per-run resolution, handed to
//! every sender of that run.

mod run;

pub use run::{RunConfiguration, RunIdentity};

use crate::errors::{FlowlogError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether senders of one run share a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterMode {
    /// Every sender gets its own writer.
    #[default]
    PerSender,
    /// One writer per run, shared by all its senders.
    Shared,
}

/// Connection settings for the indexing backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Backend host name.
    #[serde(default = "default_host")]
    pub host: String,
    /// Backend port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Index path; a leading `/` is added when missing.
    #[serde(default = "default_key")]
    pub key: String,
    /// Whether to use HTTPS.
    #[serde(default)]
    pub ssl: bool,
    /// Basic-auth user name.
    #[serde(default)]
    pub username: Option<String>,
    /// Basic-auth password.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// PKCS#12 trust store with an empty password.
    #[serde(default, skip_serializing)]
    pub trust_store: Option<Vec<u8>>,
    /// Whether console annotations are shipped alongside messages.
    #[serde(default)]
    pub save_annotations: bool,
    /// Identifier of the engine instance producing the events.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
    /// Writer sharing between senders.
    #[serde(default)]
    pub writer_mode: WriterMode,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_key() -> String {
    "/flowlog/_doc".to_string()
}

fn default_instance_id() -> String {
    "default".to_string()
}

fn default_timeout() -> f64 {
    30.0
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            key: default_key(),
            ssl: false,
            username: None,
            password: None,
            trust_store: None,
            save_annotations: false,
            instance_id: default_instance_id(),
            writer_mode: WriterMode::default(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl IndexerConfig {
    /// Creates a configuration for the given endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            key: key.into(),
            ..Self::default()
        }
    }

    /// Enables or disables HTTPS.
    #[must_use]
    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
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

    /// Sets the instance id.
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Sets the writer mode.
    #[must_use]
    pub fn with_writer_mode(mut self, mode: WriterMode) -> Self {
        self.writer_mode = mode;
        self
    }

    /// Gets timeout as Duration.
    ///
    /// Rejects values that are not a positive, representable number of
    /// seconds.
    pub fn timeout(&self) -> Result<Duration> {
        if self.timeout_seconds.is_nan() || self.timeout_seconds <= 0.0 {
            return Err(FlowlogError::configuration(format!(
                "timeout must be positive, got {}",
                self.timeout_seconds
            )));
        }
        Duration::try_from_secs_f64(self.timeout_seconds).map_err(|e| {
            FlowlogError::configuration(format!("invalid timeout {}: {e}", self.timeout_seconds))
        })
    }

    /// Builds the endpoint URI.
    pub fn uri(&self) -> Result<Url> {
        let scheme = if self.ssl { "https" } else { "http" };
        let key = if self.key.starts_with('/') {
            self.key.clone()
        } else {
            format!("/{}", self.key)
        };
        Url::parse(&format!("{scheme}://{}:{}{key}", self.host, self.port))
            .map_err(|e| FlowlogError::configuration(format!("invalid endpoint: {e}")))
    }

    /// Reads the configuration from `FLOWLOG_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, using defaults for unset keys.
    ///
    /// `FLOWLOG_TRUST_STORE` names a file whose bytes become the trust store.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("FLOWLOG_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("FLOWLOG_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| FlowlogError::configuration(format!("invalid port: {port}")))?;
        }
        if let Some(key) = lookup("FLOWLOG_KEY") {
            config.key = key;
        }
        if let Some(ssl) = lookup("FLOWLOG_SSL") {
            config.ssl = parse_flag(&ssl);
        }
        config.username = lookup("FLOWLOG_USERNAME");
        config.password = lookup("FLOWLOG_PASSWORD");
        if let Some(path) = lookup("FLOWLOG_TRUST_STORE") {
            let bytes = std::fs::read(&path).map_err(|e| {
                FlowlogError::configuration(format!("unreadable trust store {path}: {e}"))
            })?;
            config.trust_store = Some(bytes);
        }
        if let Some(save) = lookup("FLOWLOG_SAVE_ANNOTATIONS") {
            config.save_annotations = parse_flag(&save);
        }
        if let Some(instance_id) = lookup("FLOWLOG_INSTANCE_ID") {
            config.instance_id = instance_id;
        }
        if let Some(mode) = lookup("FLOWLOG_WRITER_MODE") {
            config.writer_mode = match mode.trim().to_lowercase().as_str() {
                "shared" => WriterMode::Shared,
                "per_sender" | "per-sender" => WriterMode::PerSender,
                other => {
                    return Err(FlowlogError::configuration(format!(
                        "unknown writer mode: {other}"
                    )))
                }
            };
        }
        if let Some(timeout) = lookup("FLOWLOG_TIMEOUT_SECONDS") {
            config.timeout_seconds = timeout.trim().parse().map_err(|_| {
                FlowlogError::configuration(format!("invalid timeout: {timeout}"))
            })?;
            config.timeout()?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_uri_adds_leading_slash() {
        let config = IndexerConfig::new("es.local", 9243, "logs/_doc").with_ssl(true);
        assert_eq!(config.uri().unwrap().as_str(), "https://es.local:9243/logs/_doc");

        let config = IndexerConfig::new("es.local", 9200, "/logs/_doc");
        assert_eq!(config.uri().unwrap().as_str(), "http://es.local:9200/logs/_doc");
    }

    #[test]
    fn test_uri_rejects_bad_host() {
        let config = IndexerConfig::new("bad host", 9200, "/x");
        assert!(matches!(config.uri(), Err(FlowlogError::Configuration(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: IndexerConfig =
            serde_json::from_str(r#"{"host": "es", "save_annotations": true}"#).unwrap();
        assert_eq!(config.host, "es");
        assert_eq!(config.port, 9200);
        assert!(config.save_annotations);
        assert_eq!(config.writer_mode, WriterMode::PerSender);
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_password_not_serialized() {
        let config = IndexerConfig::default().with_credentials("user", "secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("user"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_from_lookup() {
        let config = IndexerConfig::from_lookup(lookup_from(&[
            ("FLOWLOG_HOST", "es.internal"),
            ("FLOWLOG_PORT", "9243"),
            ("FLOWLOG_SSL", "true"),
            ("FLOWLOG_USERNAME", "shipper"),
            ("FLOWLOG_WRITER_MODE", "shared"),
            ("FLOWLOG_SAVE_ANNOTATIONS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.host, "es.internal");
        assert_eq!(config.port, 9243);
        assert!(config.ssl);
        assert_eq!(config.username.as_deref(), Some("shipper"));
        assert_eq!(config.writer_mode, WriterMode::Shared);
        assert!(config.save_annotations);
    }

    #[test]
    fn test_from_lookup_invalid_values() {
        assert!(IndexerConfig::from_lookup(lookup_from(&[("FLOWLOG_PORT", "http")])).is_err());
        assert!(IndexerConfig::from_lookup(lookup_from(&[("FLOWLOG_WRITER_MODE", "pool")])).is_err());
        assert!(IndexerConfig::from_lookup(lookup_from(&[(
            "FLOWLOG_TRUST_STORE",
            "/nonexistent/trust.p12"
        )]))
        .is_err());
    }

    #[test]
    fn test_out_of_range_timeouts_are_rejected() {
        for value in ["1e30", "inf", "NaN", "0", "-5"] {
            let result = IndexerConfig::from_lookup(lookup_from(&[("FLOWLOG_TIMEOUT_SECONDS", value)]));
            assert!(
                matches!(result, Err(FlowlogError::Configuration(_))),
                "{value} should be rejected"
            );
        }

        let config = IndexerConfig::from_lookup(lookup_from(&[("FLOWLOG_TIMEOUT_SECONDS", "2.5")]))
            .unwrap();
        assert_eq!(config.timeout().unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_deserialized_huge_timeout_is_configuration_error() {
        let config: IndexerConfig = serde_json::from_str(r#"{"timeout_seconds": 1e30}"#).unwrap();
        assert!(matches!(config.timeout(), Err(FlowlogError::Configuration(_))));
    }
}
