//! Config subcommand handlers.

use std::path::PathBuf;

use tracing::info;

use linktray_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// `--config` if given, otherwise the platform location.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config::config_path)
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = resolve_path(global);

    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string());
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_from(&path)?;
            cfg.validate()?;
            let rendered = output::render_single(&global.output, &cfg, |c: &Config| {
                Ok(toml::to_string_pretty(c)?)
            })?;
            output::print_output(&rendered);
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            config::save_config_to(&Config::default(), &path)?;
            info!(path = %path.display(), "config written");
            output::print_output(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}
