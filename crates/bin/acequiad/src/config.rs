//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `acequia.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Liveness sweep settings.
    pub sweep: SweepConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Liveness sweep configuration.
///
/// A device whose `last_update` is more than `offline_after_secs` old when
/// a sweep runs gets flagged offline. The threshold is policy, so it lives
/// here and nowhere in the core.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Whether the sweep runs at all.
    pub enabled: bool,
    /// Seconds between sweeps.
    pub interval_secs: u64,
    /// Silence threshold in seconds before a device is flagged offline.
    pub offline_after_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `acequia.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("acequia.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ACEQUIA_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("ACEQUIA_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.sweep.interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("ACEQUIA_OFFLINE_AFTER_SECS") {
            if let Ok(secs) = val.parse() {
                self.sweep.offline_after_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("ACEQUIA_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sweep interval must be non-zero".to_string(),
            ));
        }
        if self.sweep.offline_after_secs == 0 {
            return Err(ConfigError::Validation(
                "offline threshold must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Return the silence threshold as a duration.
    #[must_use]
    pub fn offline_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.sweep.offline_after_secs).unwrap_or(i64::MAX))
    }

    /// Return the sweep cadence as a duration.
    #[must_use]
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep.interval_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:acequia.db?mode=rwc".to_string(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            offline_after_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "acequiad=info,acequia=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
