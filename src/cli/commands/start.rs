//! Start command - launch gorund in the background

use crate::config::{Config, ConfigManager};
use crate::error::GorunResult;
use crate::ui::{self, UiContext};

/// Execute the start command
pub async fn execute(ctx: &UiContext, paths: &ConfigManager, config: &Config) -> GorunResult<()> {
    let daemon = super::daemon(paths, config)?;
    let pid = daemon.start().await?;

    ui::step_ok(ctx, &format!("Started process {}", pid));
    ui::step_info(ctx, &format!("Logging to {}", daemon.log_file().display()));
    Ok(())
}
