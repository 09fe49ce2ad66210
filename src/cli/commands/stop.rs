//! Stop command - terminate the background gorund

use crate::config::{Config, ConfigManager};
use crate::error::GorunResult;
use crate::ui::{self, UiContext};

/// Execute the stop command
pub async fn execute(ctx: &UiContext, paths: &ConfigManager, config: &Config) -> GorunResult<()> {
    let pid = super::daemon(paths, config)?.stop().await?;

    ui::step_ok(ctx, &format!("Stopped {}", pid));
    Ok(())
}
