//! Status command - report whether gorund is running

use crate::config::{Config, ConfigManager};
use crate::daemon::DaemonStatus;
use crate::error::GorunResult;
use console::style;

/// Execute the status command
pub async fn execute(paths: &ConfigManager, config: &Config) -> GorunResult<()> {
    let daemon = super::daemon(paths, config)?;

    match daemon.status().await? {
        DaemonStatus::Running(pid) => {
            println!("{} gorund running pid {}", style("✓").green(), pid);
            println!("  Socket: {}", paths.socket_path(config).display());
            println!("  Log:    {}", daemon.log_file().display());
        }
        DaemonStatus::Stale(pid) => {
            println!(
                "{} gorund not running (stale pid {})",
                style("!").yellow(),
                pid
            );
            println!("  Start with: gorund start");
        }
        DaemonStatus::Stopped => {
            println!("{} gorund not running", style("✗").red());
            println!("  Start with: gorund start");
        }
    }

    Ok(())
}
