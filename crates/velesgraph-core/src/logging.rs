//! Tracing subscriber bootstrap.
//!
//! The library only emits `tracing` events. Embedders that do not install
//! their own subscriber can call [`init_logging`] once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{ConfigError, LoggingConfig};

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| ConfigError::InvalidValue {
        key: "logging.level".to_string(),
        message: e.to_string(),
    })
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the level or format is invalid, or if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format.as_str() {
        "text" => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        other => {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!("value '{other}' is invalid, expected one of: text, json"),
            })
        }
    };

    installed.map_err(|e| ConfigError::Logging(e.to_string()))
}
