//! Configuration module for the relay services
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`RABBIT_HOST`, `RELAY_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use relay::config::RelayConfig;
//!
//! let config = RelayConfig::default();
//! assert_eq!(config.server.port, 5000);
//!
//! let toml = r#"
//! [broker]
//! host = "rabbitmq"
//! "#;
//! let config: RelayConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.broker.host, "rabbitmq");
//! ```

pub mod broker;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod server;

pub use broker::{BrokerConfig, DEFAULT_QUEUE};
pub use dashboard::DashboardConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the broker host.
pub const RABBIT_HOST_ENV: &str = "RABBIT_HOST";

/// Unified configuration for all three services.
///
/// Every service reads the whole file and uses the sections it needs:
/// the publisher and consumer use `broker`, the dashboard uses `dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Broker connection settings
    pub broker: BrokerConfig,
    /// Dashboard polling settings
    pub dashboard: DashboardConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_path_buf(),
                    source,
                })?;
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: p.to_path_buf(),
                    source,
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var(RABBIT_HOST_ENV) {
            self.broker.host = host;
        }

        if let Ok(port) = std::env::var("RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("RELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(url) = std::env::var("RELAY_REPORT_URL") {
            self.dashboard.report_url = url;
        }

        if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RELAY_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(validation("server.port", "port must be non-zero"));
        }
        if self.broker.host.trim().is_empty() {
            return Err(validation("broker.host", "host cannot be empty"));
        }
        if self.broker.queue.trim().is_empty() {
            return Err(validation("broker.queue", "queue name cannot be empty"));
        }
        if self.broker.connect_attempts == 0 {
            return Err(validation(
                "broker.connect_attempts",
                "at least one attempt is required",
            ));
        }
        if self.dashboard.report_url.trim().is_empty() {
            return Err(validation("dashboard.report_url", "URL cannot be empty"));
        }
        if self.dashboard.refresh_interval_seconds == 0 {
            return Err(validation(
                "dashboard.refresh_interval_seconds",
                "interval must be at least one second",
            ));
        }
        if self.dashboard.fetch_attempts == 0 {
            return Err(validation(
                "dashboard.fetch_attempts",
                "at least one attempt is required",
            ));
        }
        self.logging.check_components()?;

        Ok(())
    }
}

fn validation(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}
