use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Default remote task store
pub const DEFAULT_API_URL: &str = "https://todo-list-api-remi.herokuapp.com";

/// Environment variable overriding `remote.base_url`
pub const API_URL_ENV: &str = "TASKLIST_API_URL";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote task store settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Retry/backoff for remote calls
    #[serde(default)]
    pub retry: RetrySettings,

    /// Reconciliation behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Search filter behavior
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the task store API
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

/// How the view is reordered after a checkbox toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOrdering {
    /// Walk the view in order: done tasks are appended, open tasks are
    /// prepended. Open tasks end up in reverse relative order.
    #[default]
    Replay,
    /// Open tasks first, then done tasks, both keeping their relative order.
    Stable,
}

/// What happens to an optimistic change when its remote call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Undo the local change and record a retryable failure.
    #[default]
    Rollback,
    /// Keep the local change as-is and only record the failure.
    Detach,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub toggle_ordering: ToggleOrdering,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

/// How search input is turned into a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Case-insensitive regular expression; invalid input matches nothing.
    #[default]
    Regex,
    /// Case-insensitive substring; input is escaped before compilation.
    Literal,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: SearchMode,
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if it doesn't exist. `TASKLIST_API_URL` overrides the base URL.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            tracing::debug!("Using {} from environment", API_URL_ENV);
            config.remote.base_url = url;
        }
        Ok(config)
    }

    /// Load configuration from a specific file, writing defaults there if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Ok(Self::load()?.into_validated()?)
    }

    /// Validate, rejecting the config if there are any errors
    pub fn into_validated(self) -> Result<(Self, ValidationResult), ConfigError> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.remote.base_url, "remote.base_url", &mut result);

        if self.remote.timeout_secs == 0 {
            result.add_error("remote.timeout_secs", "Timeout must be greater than 0");
        } else if self.remote.timeout_secs > 300 {
            result.add_warning(
                "remote.timeout_secs",
                "Timeout is unusually long (>300 seconds)",
            );
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            result.add_error(
                "retry.initial_delay_ms",
                "Initial delay cannot exceed max delay",
            );
        }

        if self.retry.max_retries == 0 {
            result.add_warning("retry.max_retries", "Retries disabled (0 attempts)");
        }

        if self.sync.failure_policy == FailurePolicy::Detach {
            result.add_warning(
                "sync.failure_policy",
                "Failed changes stay visible without being saved",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("tasklist");

        Ok(config_dir.join("config.toml"))
    }
}
