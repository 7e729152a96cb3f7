//! Configuration file for linktray.
//!
//! TOML file + `LINKTRAY_*` environment overrides, validation, and
//! translation to `linktray_core::RegistryConfig`. The core never reads
//! files; it only sees the validated runtime config built here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use linktray_core::config::{DEFAULT_DISCONNECT_TIMEOUT, DEFAULT_SAMPLE_CAPACITY, DEFAULT_SAMPLE_INTERVAL};
use linktray_core::{RegistryConfig, SamplerConfig};

/// Upper bound on retained samples: one day at 1 Hz.
pub const MAX_SAMPLE_CAPACITY: usize = 86_400;

/// Accepted values for `log.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub log: LogSection,
}

/// `[sampler]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SamplerSection {
    /// Milliseconds between two traffic samples.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Samples kept per series.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            capacity: default_capacity(),
        }
    }
}

/// `[transport]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransportSection {
    /// Upper bound on a disconnect when an active connection is removed.
    #[serde(default = "default_disconnect_timeout_secs")]
    pub disconnect_timeout_secs: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            disconnect_timeout_secs: default_disconnect_timeout_secs(),
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSection {
    /// Level used when neither `RUST_LOG` nor `-v` is given.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to this file instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_interval_ms() -> u64 {
    u64::try_from(DEFAULT_SAMPLE_INTERVAL.as_millis()).unwrap_or(1_000)
}
fn default_capacity() -> usize {
    DEFAULT_SAMPLE_CAPACITY
}
fn default_disconnect_timeout_secs() -> u64 {
    DEFAULT_DISCONNECT_TIMEOUT.as_secs()
}
fn default_log_level() -> String {
    "warn".into()
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampler.interval_ms == 0 {
            return Err(ConfigError::invalid(
                "sampler.interval_ms",
                "must be greater than 0",
            ));
        }
        if !(1..=MAX_SAMPLE_CAPACITY).contains(&self.sampler.capacity) {
            return Err(ConfigError::invalid(
                "sampler.capacity",
                format!(
                    "must be between 1 and {MAX_SAMPLE_CAPACITY}, got {}",
                    self.sampler.capacity
                ),
            ));
        }
        if self.transport.disconnect_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "transport.disconnect_timeout_secs",
                "must be greater than 0",
            ));
        }
        let level = self.log.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid(
                "log.level",
                format!(
                    "expected one of {}, got '{}'",
                    LOG_LEVELS.join(", "),
                    self.log.level
                ),
            ));
        }
        Ok(())
    }

    /// Validate, then build the runtime config the registry consumes.
    pub fn to_registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        self.validate()?;
        Ok(RegistryConfig {
            sampler: SamplerConfig {
                interval: Duration::from_millis(self.sampler.interval_ms),
                capacity: self.sampler.capacity,
            },
            disconnect_timeout: Duration::from_secs(self.transport.disconnect_timeout_secs),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "linktray", "linktray").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("linktray");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then `LINKTRAY_*` variables.
///
/// Nested keys use a double underscore: `LINKTRAY_SAMPLER__CAPACITY=60`.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LINKTRAY_").split("__"))
}

/// Load the config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
