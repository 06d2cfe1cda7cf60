//! `[logging]` section

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Modules that accept a level under `[logging.component_levels]`.
pub const COMPONENTS: &[&str] = &["broker", "publisher", "consumer", "dashboard", "retry", "cli"];

/// Output format of the service logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Validation {
                field: "logging.format".to_string(),
                message: format!("expected \"pretty\" or \"json\", got {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter level for every target.
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels, e.g. `broker = "warn"`. Keys come from [`COMPONENTS`].
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub component_levels: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Reject component names that are not relay modules, so a typo does
    /// not silently leave a module at the base level.
    pub fn check_components(&self) -> Result<(), ConfigError> {
        match self
            .component_levels
            .keys()
            .find(|name| !COMPONENTS.contains(&name.as_str()))
        {
            Some(unknown) => Err(ConfigError::Validation {
                field: format!("logging.component_levels.{unknown}"),
                message: format!("unknown component, expected one of {}", COMPONENTS.join(", ")),
            }),
            None => Ok(()),
        }
    }
}
