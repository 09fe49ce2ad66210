//! Rebuild command - recompile a package gorun has already run

use super::autostart::start_daemon;
use super::run::current_request_env;
use crate::cli::args::RunArgs;
use crate::config::{Config, ConfigManager};
use crate::error::GorunResult;
use crate::ui::{self, UiContext};

/// Execute the rebuild command
///
/// Program arguments are ignored; nothing is executed.
pub async fn execute(
    args: RunArgs,
    ctx: &UiContext,
    paths: &ConfigManager,
    config: &Config,
) -> GorunResult<()> {
    let client = super::client(paths, config);
    let env = current_request_env()?;

    match client.rebuild_executable(&args.package, env.clone()).await {
        Err(e) if e.is_unreachable() => {
            start_daemon(ctx, paths, config, &client, e).await?;
            client.rebuild_executable(&args.package, env).await?;
        }
        result => result?,
    }

    ui::step_ok(ctx, &format!("Rebuilt {}", args.package));
    Ok(())
}
