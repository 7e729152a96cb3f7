//! CLI error types with miette diagnostics.
//!
//! Maps `LinkError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use linktray_config::ConfigError;
use linktray_core::LinkError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Links ────────────────────────────────────────────────────────

    #[error("Invalid connection link: {reason}")]
    #[diagnostic(
        code(linktray::invalid_link),
        help("Supported links: vless://, vmess://, trojan://, ss://")
    )]
    InvalidLink { reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(linktray::validation),
        help("Fix the value in the config file or the LINKTRAY_* environment.")
    )]
    Validation { field: String, reason: String },

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(linktray::config_exists),
        help(
            "Use --force to overwrite it.\n\
             Found at: {path}"
        )
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(linktray::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(linktray::toml))]
    Toml(#[from] toml::ser::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(linktray::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(linktray::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidLink { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::ConfigExists { .. } => exit_code::CONFLICT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Library errors → CliError ────────────────────────────────────────

impl From<LinkError> for CliError {
    fn from(err: LinkError) -> Self {
        CliError::InvalidLink {
            reason: err.to_string(),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Serialization(e) => CliError::Toml(e),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
