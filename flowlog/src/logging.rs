//! Diagnostic logging setup for hosts embedding flowlog.
//!
//! The level filter comes from the `FLOWLOG_LOG` environment variable
//! (`EnvFilter` syntax, e.g. `flowlog=debug`) and defaults to `info`.
//! Output goes to stderr so it never mixes with console streams.

use crate::errors::{FlowlogError, Result};
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "FLOWLOG_LOG";

/// Output format of the diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = FlowlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(FlowlogError::configuration(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Builds the stderr subscriber without installing it.
pub fn subscriber(format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Json => Box::new(builder.json().finish()),
        LogFormat::Text => Box::new(builder.finish()),
    }
}

/// Installs the global `tracing` subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber(format))
        .map_err(|e| FlowlogError::configuration(format!("cannot install tracing subscriber: {e}")))
}
