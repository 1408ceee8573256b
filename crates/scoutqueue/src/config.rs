//! Configuration management for scoutqueue.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.
//!
//! The queue, detector and channel treat every value here as opaque; only the
//! CLI wiring reads them.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::RecordKind;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "scoutqueue";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "outbox.db";

/// Default roster API base.
const DEFAULT_ROSTER_BASE_URL: &str = "https://www.thebluealliance.com/api/v3";

/// Event keys look like `2026wiapp`: a season year followed by a short code.
const EVENT_KEY_PATTERN: &str = r"^\d{4}[a-z0-9]+$";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SCOUTQUEUE_`, `__` between sections)
/// 2. TOML config file at `~/.config/scoutqueue/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delivery endpoint configuration.
    pub delivery: DeliveryConfig,
    /// Team roster lookup configuration.
    pub roster: RosterConfig,
    /// Event being scouted.
    pub event: EventConfig,
    /// Offline queue configuration.
    pub queue: QueueConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Shared-code access and demo mode.
    pub access: AccessConfig,
}

/// Where completed records are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Collector URL. Empty means every delivery fails and records queue.
    pub endpoint_url: String,
    /// Name of the single form field carrying the JSON record.
    pub form_field: String,
}

/// Team roster lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Set to false to skip network lookups entirely.
    pub enabled: bool,
    /// API base URL (no trailing slash needed).
    pub base_url: String,
    /// Read key sent as `X-TBA-Auth-Key`. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

/// Event settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Event key stamped on every record, e.g. `2026wiapp`.
    pub event_key: String,
}

/// Offline queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Deployment name the queue slots are scoped to. Not the event: a
    /// queue survives an event change.
    pub deployment: String,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/scoutqueue/outbox.db`
    pub database_path: Option<PathBuf>,
}

/// Access settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Shared code a scout must present to submit. `None` disables the check.
    /// Never serialized.
    #[serde(skip_serializing)]
    pub secret_code: Option<String>,
    /// Demo deployments never deliver or queue anything.
    pub demo: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            form_field: "payload".to_string(),
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_ROSTER_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            deployment: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("SCOUTQUEUE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.delivery.endpoint_url.trim();
        if !endpoint.is_empty() && !is_http_url(endpoint) {
            return Err(Error::ConfigValidation {
                message: format!("endpoint_url must use http or https: {endpoint}"),
            });
        }

        if self.delivery.form_field.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "form_field must not be empty".to_string(),
            });
        }

        if self.roster.enabled && !is_http_url(self.roster.base_url.trim()) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "roster base_url must use http or https: {}",
                    self.roster.base_url
                ),
            });
        }

        let event_key = self.event.event_key.trim();
        if !event_key.is_empty() {
            let pattern = regex::Regex::new(EVENT_KEY_PATTERN)
                .map_err(|e| Error::internal(format!("event key pattern: {e}")))?;
            if !pattern.is_match(event_key) {
                return Err(Error::ConfigValidation {
                    message: format!("invalid event_key: {event_key}"),
                });
            }
        }

        if self.queue.deployment.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "queue deployment must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Storage slot holding the offline queue for `kind`.
    #[must_use]
    pub fn queue_key(&self, kind: RecordKind) -> String {
        format!("scoutQueue_{}_{}", self.queue.deployment.trim(), kind)
    }

    /// Check a presented submit code against the shared secret.
    ///
    /// Always passes when no secret is configured.
    #[must_use]
    pub fn verify_code(&self, presented: &str) -> bool {
        match &self.access.secret_code {
            Some(expected) => expected.trim() == presented.trim(),
            None => true,
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
