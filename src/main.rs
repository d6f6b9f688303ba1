use anyhow::Context;
use clap::Parser;
use sealsync::commands::sync::{error_kind_label, humanize_error};
use sealsync::config::Cli;
use sealsync::{Config, SyncError};
use std::process::ExitCode;
use tracing::{debug, error};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = sealsync::logging::init(cli.verbose, cli.progress) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli).context("Invalid configuration")?;
    debug!("sealsync v{}: {:?}", sealsync::VERSION, config);

    let remote = config.remote_base.clone();
    if config.restore {
        sealsync::commands::restore::run(config)
            .with_context(|| format!("Restore from {remote} failed"))?;
    } else {
        sealsync::commands::sync::run(config)
            .with_context(|| format!("Synchronization to {remote} failed"))?;
    }
    Ok(())
}

fn report_error(err: &anyhow::Error) {
    match err.chain().find_map(|cause| cause.downcast_ref::<SyncError>()) {
        Some(sync_error) => {
            let (message, suggestion) = humanize_error(sync_error);
            error!("{}: {}", error_kind_label(sync_error), message);
            if let Some(suggestion) = suggestion {
                error!("Try: {suggestion}");
            }
            debug!("{err:#}");
        }
        None => error!("{err:#}"),
    }
}
