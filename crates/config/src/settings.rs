//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use handover_core::{HandoverCriteria, HandoverRecipient, ScoreScale, DEFAULT_KEYWORD_TRIGGERS};

use crate::ConfigError;

/// Address used when neither the campaign nor the environment names a recipient
pub const FALLBACK_HANDOVER_EMAIL: &str = "sales@example.com";
pub const FALLBACK_HANDOVER_NAME: &str = "Sales Team";

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation, log-only notifications allowed
    #[default]
    Development,
    Staging,
    /// All validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// ScyllaDB persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub handover: HandoverSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "lead_handover".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Handover behaviour that is not campaign specific
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoverSettings {
    /// Recipient used when a campaign lists none
    #[serde(default = "default_recipient")]
    pub default_recipient: HandoverRecipient,

    /// Criteria used when no campaign is given or the campaign has none
    #[serde(default)]
    pub default_criteria: DefaultCriteriaConfig,

    /// Upper bound for a single notification delivery
    #[serde(default = "default_notification_timeout_secs")]
    pub notification_timeout_secs: u64,

    /// Attempts at the versioned lead update before giving up
    #[serde(default = "default_max_update_attempts")]
    pub max_update_attempts: u32,
}

fn default_recipient() -> HandoverRecipient {
    let email = std::env::var("DEFAULT_HANDOVER_EMAIL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_HANDOVER_EMAIL.to_string());
    let name = std::env::var("DEFAULT_HANDOVER_NAME")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_HANDOVER_NAME.to_string());
    HandoverRecipient::new(name, email, "sales")
}

fn default_notification_timeout_secs() -> u64 {
    30
}

fn default_max_update_attempts() -> u32 {
    3
}

impl Default for HandoverSettings {
    fn default() -> Self {
        Self {
            default_recipient: default_recipient(),
            default_criteria: DefaultCriteriaConfig::default(),
            notification_timeout_secs: default_notification_timeout_secs(),
            max_update_attempts: default_max_update_attempts(),
        }
    }
}

/// Built-in criteria in snake_case so environment overrides map onto them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultCriteriaConfig {
    #[serde(default = "default_qualification_score")]
    pub qualification_score: f64,
    #[serde(default)]
    pub score_scale: ScoreScale,
    #[serde(default = "default_conversation_length")]
    pub conversation_length: u32,
    #[serde(default = "default_time_threshold_secs")]
    pub time_threshold_secs: u64,
    #[serde(default = "default_keyword_triggers")]
    pub keyword_triggers: Vec<String>,
}

fn default_qualification_score() -> f64 {
    handover_core::criteria::DEFAULT_QUALIFICATION_SCORE
}

fn default_conversation_length() -> u32 {
    handover_core::criteria::DEFAULT_CONVERSATION_LENGTH
}

fn default_time_threshold_secs() -> u64 {
    handover_core::criteria::DEFAULT_TIME_THRESHOLD_SECS
}

fn default_keyword_triggers() -> Vec<String> {
    DEFAULT_KEYWORD_TRIGGERS.iter().map(|k| k.to_string()).collect()
}

impl Default for DefaultCriteriaConfig {
    fn default() -> Self {
        Self {
            qualification_score: default_qualification_score(),
            score_scale: ScoreScale::Ten,
            conversation_length: default_conversation_length(),
            time_threshold_secs: default_time_threshold_secs(),
            keyword_triggers: default_keyword_triggers(),
        }
    }
}

impl DefaultCriteriaConfig {
    /// Build validated criteria; recipients stay empty so the default recipient applies
    pub fn to_criteria(&self) -> Result<HandoverCriteria, handover_core::Error> {
        HandoverCriteria {
            qualification_score: self.qualification_score,
            score_scale: self.score_scale,
            conversation_length: self.conversation_length,
            time_threshold: self.time_threshold_secs,
            keyword_triggers: self.keyword_triggers.clone(),
            ..HandoverCriteria::default()
        }
        .validated()
    }
}

/// Outbound notification transport
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationSettings {
    /// POST handover notifications to this URL when set
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Bearer token sent with webhook requests
    #[serde(default)]
    pub webhook_token: Option<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_handover()?;
        self.validate_persistence()?;
        self.validate_notifications()?;
        Ok(())
    }

    fn validate_handover(&self) -> Result<(), ConfigError> {
        let handover = &self.handover;

        let email = handover.default_recipient.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ConfigError::InvalidValue {
                field: "handover.default_recipient.email".to_string(),
                message: format!("'{}' is not an email address", email),
            });
        }

        if handover.notification_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "handover.notification_timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if handover.max_update_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "handover.max_update_attempts".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        self.default_criteria()?;
        Ok(())
    }

    fn validate_persistence(&self) -> Result<(), ConfigError> {
        if self.persistence.enabled && self.persistence.scylla_hosts.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persistence.scylla_hosts".to_string(),
                message: "At least one host is required when persistence is enabled".to_string(),
            });
        }

        if self.persistence.replication_factor == 0 {
            return Err(ConfigError::InvalidValue {
                field: "persistence.replication_factor".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn validate_notifications(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.notifications.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "notifications.webhook_url".to_string(),
                    message: format!("Unsupported URL scheme: {}", url),
                });
            }
            if self.environment.is_production() && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "notifications.webhook_url".to_string(),
                    message: "Production requires an https webhook".to_string(),
                });
            }
        }

        // Strict environments must deliver somewhere real
        if self.environment.is_strict()
            && !self.persistence.enabled
            && self.notifications.webhook_url.is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: "notifications".to_string(),
                message: "Either persistence or a webhook must be configured outside development"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Criteria applied when no campaign criteria exist
    pub fn default_criteria(&self) -> Result<HandoverCriteria, ConfigError> {
        self.handover
            .default_criteria
            .to_criteria()
            .map_err(|e| ConfigError::InvalidValue {
                field: "handover.default_criteria".to_string(),
                message: e.to_string(),
            })
    }
}

/// Load settings from `config/` and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (HANDOVER_ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit config directory
pub fn load_settings_from(config_dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(config_dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(config_dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("HANDOVER")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        persistence = settings.persistence.enabled,
        "Settings loaded"
    );

    Ok(settings)
}

/// Load standalone handover criteria from a YAML file
pub fn load_criteria_file(path: &Path) -> Result<HandoverCriteria, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
    let criteria: HandoverCriteria = serde_yaml::from_str(&content)?;
    criteria
        .validated()
        .map_err(|e| ConfigError::InvalidValue {
            field: path.display().to_string(),
            message: e.to_string(),
        })
}
