//! Configuration management for lead handover
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (HANDOVER_ prefix, `__` separator)
//! - `DEFAULT_HANDOVER_EMAIL` / `DEFAULT_HANDOVER_NAME` for the fallback recipient
//!
//! Campaign-specific criteria are not configured here; they come from the
//! campaign settings in storage. `handover.default_criteria` is what applies
//! when a campaign has none.

pub mod settings;

pub use settings::{
    load_criteria_file, load_settings, load_settings_from, DefaultCriteriaConfig,
    HandoverSettings, NotificationSettings, ObservabilityConfig, PersistenceConfig,
    RuntimeEnvironment, Settings, FALLBACK_HANDOVER_EMAIL,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
