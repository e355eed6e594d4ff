//! Configuration structures.
//!
//! Configuration is loaded from a YAML file; every section has defaults so an
//! empty document is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::errors::{Error, Result};

/// Global runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Tool invocation defaults.
    #[serde(default)]
    pub invocation: InvocationConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        serde_yaml::from_slice(&raw).map_err(|e| {
            Error::config_decode(format!("invalid config file {}: {}", path.display(), e))
        })
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Tool invocation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Deadline applied to each invocation (statement execution plus row reads).
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
        }
    }
}
