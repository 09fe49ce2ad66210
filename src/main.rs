//! gorun - run Go packages through the gorund compile cache
//!
//! CLI entry point: resolves the package, then execs it.

use clap::Parser;
use console::style;
use gorun::cli::Cli;
use gorun::config::ConfigManager;
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
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug.
    // Everything goes to stderr; stdout belongs to the executed program.
    let level = if ConfigManager::debug_enabled() {
        2
    } else {
        cli.verbose
    };
    let filter = match level {
        0 => EnvFilter::new("gorun=warn"),
        1 => EnvFilter::new("gorun=info"),
        _ => EnvFilter::new("gorun=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let mut paths = ConfigManager::new();
    if let Some(path) = cli.config {
        paths = paths.with_config_path(path);
    }
    paths.ensure_working_dir().await?;
    let config = paths.load().await?;

    let ctx = UiContext::detect().with_auto_yes(cli.yes);

    if cli.rebuild {
        gorun::cli::commands::rebuild(cli.run, &ctx, &paths, &config).await
    } else {
        gorun::cli::commands::run(cli.run, &ctx, &paths, &config).await
    }
}
