mod cli;
mod commands;
mod error;
mod output;

use std::ffi::OsStr;
use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use linktray_config::LogSection;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();

    // The config file may set the default level and a log file.
    let log = linktray_config::load_config_from(&commands::config_cmd::resolve_path(&cli.global))
        .map(|c| c.log)
        .unwrap_or_default();
    let guard = init_tracing(&cli.global, &log);

    if let Err(err) = run(&cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        drop(guard);
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOpts, log: &LogSection) -> Option<WorkerGuard> {
    let level = match global.verbose {
        0 => log.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = global.log_file.as_deref().or(log.file.as_deref()) else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return None;
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or(OsStr::new("linktray.log"));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
    Some(guard)
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Inspect(args) => commands::inspect::handle(args, &cli.global),

        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "linktray", &mut std::io::stdout());
            Ok(())
        }
    }
}
