//! Structured logging setup.
//!
//! All services log through `tracing`. The subscriber is configured from
//! [`LoggingConfig`]: a base level, optional per-component levels, and a
//! pretty or JSON output format. `RUST_LOG` takes precedence when set.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Build filter directives string from LoggingConfig
///
/// # Examples
///
/// ```
/// use relay::config::LoggingConfig;
/// use relay::logging::build_filter_directives;
///
/// let mut config = LoggingConfig::default();
/// config
///     .component_levels
///     .insert("dashboard".to_string(), "debug".to_string());
///
/// assert_eq!(build_filter_directives(&config), "info,relay::dashboard=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();
    for (component, level) in &config.component_levels {
        filter_str.push_str(&format!(",relay::{}={}", component, level));
    }
    filter_str
}

/// Install the global tracing subscriber.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Correlation id attached to each publish request's span.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
