//! gorund - background compile server for gorun
//!
//! CLI entry point that dispatches to daemon subcommands.

use clap::Parser;
use console::style;
use gorun::cli::{DaemonCli, DaemonCommands};
use gorun::config::{Config, ConfigManager};
use gorun::error::GorunResult;
use gorun::ui::UiContext;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> GorunResult<()> {
    let cli = DaemonCli::parse();

    let mut paths = ConfigManager::new();
    if let Some(path) = cli.config {
        paths = paths.with_config_path(path);
    }
    paths.ensure_working_dir().await?;
    let config = paths.load().await?;

    init_logging(&cli.command, cli.verbose, &config);
    let ctx = UiContext::detect();

    match cli.command {
        DaemonCommands::Start => gorun::cli::commands::start(&ctx, &paths, &config).await,
        DaemonCommands::Stop => gorun::cli::commands::stop(&ctx, &paths, &config).await,
        DaemonCommands::Status => gorun::cli::commands::status(&paths, &config).await,
        DaemonCommands::Run => gorun::cli::commands::serve(&paths, &config).await,
    }
}

/// The server logs with timestamps to its log file; the control verbs
/// log like the client
fn init_logging(command: &DaemonCommands, verbose: u8, config: &Config) {
    let debug = verbose > 0 || ConfigManager::debug_enabled();

    if let DaemonCommands::Run = command {
        let filter = if debug {
            EnvFilter::new("gorun=debug")
        } else {
            EnvFilter::new("gorun=info")
        };
        let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
        if config.general.log_format == "json" {
            builder.json().init();
        } else {
            builder.init();
        }
        return;
    }

    let filter = if debug {
        EnvFilter::new("gorun=debug")
    } else {
        EnvFilter::new("gorun=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
