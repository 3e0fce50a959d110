//! `velesgraph` Configuration Module
//!
//! Provides configuration file support via `velesgraph.toml`, environment
//! variables, and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (API)
//! 2. Environment variables (`VELESGRAPH_*`)
//! 3. Configuration file (`velesgraph.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Name of the system collection holding graph documents.
pub const DEFAULT_GRAPH_COLLECTION: &str = "_graphs";

/// Safety cap for traversal depth and path length.
pub const SAFETY_MAX_DEPTH: u32 = 100;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },

    /// The global tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Graph registry section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// System collection holding one document per graph.
    pub collection: String,
    /// Database name handed to the permission service.
    pub database: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_GRAPH_COLLECTION.to_string(),
            database: "_system".to_string(),
        }
    }
}

/// Defaults written into newly created graph documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDefaults {
    /// Shard count hint.
    pub number_of_shards: u32,
    /// Replication factor hint.
    pub replication_factor: u32,
}

impl Default for GraphDefaults {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            replication_factor: 1,
        }
    }
}

/// Query composition section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Upper bound accepted for traversal depths and path lengths.
    pub max_depth_limit: u32,
    /// Default minimum length for `paths`.
    pub paths_min_length: u32,
    /// Default maximum length for `paths`.
    pub paths_max_length: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_depth_limit: SAFETY_MAX_DEPTH,
            paths_min_length: 0,
            paths_max_length: 10,
        }
    }
}

/// Permission checks section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Consult the permission service when one is wired.
    pub enforce: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self { enforce: true }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
    /// Log format: text or json.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main `velesgraph` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GraphConfig {
    /// Graph registry configuration.
    pub registry: RegistryConfig,
    /// Defaults for new graphs.
    pub defaults: GraphDefaults,
    /// Query composition configuration.
    pub query: QueryConfig,
    /// Permission configuration.
    pub permissions: PermissionsConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl GraphConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("velesgraph.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("VELESGRAPH_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "registry.collection".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.registry.database.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "registry.database".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.defaults.number_of_shards == 0 {
            return Err(ConfigError::InvalidValue {
                key: "defaults.number_of_shards".to_string(),
                message: "value 0 must be >= 1".to_string(),
            });
        }

        if self.defaults.replication_factor == 0 {
            return Err(ConfigError::InvalidValue {
                key: "defaults.replication_factor".to_string(),
                message: "value 0 must be >= 1".to_string(),
            });
        }

        if self.query.max_depth_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "query.max_depth_limit".to_string(),
                message: "value 0 must be >= 1".to_string(),
            });
        }

        if self.query.paths_max_length > self.query.max_depth_limit {
            return Err(ConfigError::InvalidValue {
                key: "query.paths_max_length".to_string(),
                message: format!(
                    "value {} exceeds query.max_depth_limit {}",
                    self.query.paths_max_length, self.query.max_depth_limit
                ),
            });
        }

        if self.query.paths_min_length > self.query.paths_max_length {
            return Err(ConfigError::InvalidValue {
                key: "query.paths_min_length".to_string(),
                message: format!(
                    "value {} exceeds query.paths_max_length {}",
                    self.query.paths_min_length, self.query.paths_max_length
                ),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
