//! Registry configuration.
//!
//! Configuration can be built in code, read from TOML, and overridden from
//! the environment:
//!
//! ```toml
//! sweep_interval_ms = 500
//! reaper_thread_name = "ui-reaper"
//! ```
//!
//! | Variable                    | Field                |
//! |-----------------------------|----------------------|
//! | `TETHER_SWEEP_INTERVAL_MS`  | `sweep_interval_ms`  |
//! | `TETHER_REAPER_THREAD_NAME` | `reaper_thread_name` |

use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`WeakRegistryConfig::sweep_interval`].
pub const ENV_SWEEP_INTERVAL_MS: &str = "TETHER_SWEEP_INTERVAL_MS";

/// Environment variable overriding [`WeakRegistryConfig::reaper_thread_name`].
pub const ENV_REAPER_THREAD_NAME: &str = "TETHER_REAPER_THREAD_NAME";

const DEFAULT_REAPER_THREAD_NAME: &str = "tether-reaper";

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// Path to the config file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse config at {path}: {source}")]
    ParseError {
        /// Where the TOML came from.
        path: String,
        /// Underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// Field that failed validation.
        field: String,
        /// Validation failure description.
        message: String,
    },

    /// Environment variable error.
    #[error("Environment variable '{var_name}': {message}")]
    EnvError {
        /// Name of the environment variable.
        var_name: String,
        /// Error description.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for a [`WeakRegistry`](crate::WeakRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeakRegistryConfig {
    /// How often the reaper thread sweeps. `None` runs no reaper; sweeps
    /// then only happen through [`WeakRegistry::sweep`](crate::WeakRegistry::sweep).
    #[serde(
        rename = "sweep_interval_ms",
        with = "millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub sweep_interval: Option<Duration>,
    /// Name given to the reaper thread.
    pub reaper_thread_name: String,
}

impl Default for WeakRegistryConfig {
    fn default() -> Self {
        Self {
            sweep_interval: None,
            reaper_thread_name: DEFAULT_REAPER_THREAD_NAME.to_string(),
        }
    }
}

impl WeakRegistryConfig {
    /// Sweep every `interval` from a background thread.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Only sweep on demand.
    #[must_use]
    pub fn without_reaper(mut self) -> Self {
        self.sweep_interval = None;
        self
    }

    /// Name the reaper thread.
    #[must_use]
    pub fn with_reaper_thread_name(mut self, name: impl Into<String>) -> Self {
        self.reaper_thread_name = name.into();
        self
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] for malformed TOML or unknown
    /// keys, and [`ConfigError::ValidationError`] for invalid values.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "<inline>")
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read, plus
    /// every error of [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TETHER_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvError`] if a variable is set to an invalid
    /// value.
    pub fn apply_env(self) -> ConfigResult<Self> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply `TETHER_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`apply_env`](Self::apply_env).
    pub fn apply_env_from<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_SWEEP_INTERVAL_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::EnvError {
                var_name: ENV_SWEEP_INTERVAL_MS.to_string(),
                message: format!("expected milliseconds, got '{raw}'"),
            })?;
            // 0 disables the reaper.
            self.sweep_interval = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(name) = lookup(ENV_REAPER_THREAD_NAME) {
            self.reaper_thread_name = name;
        }
        self.validate().map_err(|e| ConfigError::EnvError {
            var_name: "TETHER_*".to_string(),
            message: e.to_string(),
        })?;
        Ok(self)
    }

    /// Check value constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero sweep interval or
    /// an unusable thread name.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ValidationError {
                field: "sweep_interval_ms".to_string(),
                message: "must be greater than zero; omit it to disable the reaper".to_string(),
            });
        }
        if self.reaper_thread_name.is_empty() || self.reaper_thread_name.contains('\0') {
            return Err(ConfigError::ValidationError {
                field: "reaper_thread_name".to_string(),
                message: "must be non-empty and contain no NUL bytes".to_string(),
            });
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option)]
    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
