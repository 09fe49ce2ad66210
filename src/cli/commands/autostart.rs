//! Starting gorund on demand when the client cannot reach it

use crate::config::schema::AutoStart;
use crate::config::{Config, ConfigManager, CONFIG_ENV, WORKING_DIR_ENV};
use crate::error::{GorunError, GorunResult};
use crate::rpc::Client;
use crate::ui::{self, UiContext};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);
const READY_POLL_ATTEMPTS: u32 = 100;

/// Offer to start gorund after `unreachable`, then wait for its socket
///
/// Returns `unreachable` unchanged when starting is declined or disabled,
/// so the caller reports the original failure.
pub(crate) async fn start_daemon(
    ctx: &UiContext,
    paths: &ConfigManager,
    config: &Config,
    client: &Client,
    unreachable: GorunError,
) -> GorunResult<()> {
    ui::step_warn(ctx, "gorund appears to not be running");
    let approved = match config.client.auto_start {
        AutoStart::Never => false,
        AutoStart::Always => true,
        AutoStart::Prompt => ui::confirm(ctx, "Start up gorund?", false).await?,
    };
    if !approved {
        return Err(unreachable);
    }

    let gorund = gorund_path();
    debug!("Starting {}", gorund.display());
    let output = Command::new(&gorund)
        .arg("start")
        .env(WORKING_DIR_ENV, paths.working_dir())
        .env(CONFIG_ENV, paths.config_path())
        .output()
        .await
        .map_err(|source| GorunError::SpawnFailed {
            command: format!("{} start", gorund.display()),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GorunError::User(format!(
            "gorund start failed: {}",
            stderr.trim()
        )));
    }

    wait_until_reachable(client).await?;
    info!("gorund is up at {}", client.socket().display());
    ui::step_ok(ctx, "Started gorund");
    Ok(())
}

/// Poll the socket until the new server accepts connections
async fn wait_until_reachable(client: &Client) -> GorunResult<()> {
    for _ in 0..READY_POLL_ATTEMPTS {
        if client.is_reachable().await {
            return Ok(());
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }

    Err(GorunError::User(format!(
        "gorund did not start listening on {}",
        client.socket().display()
    )))
}

/// `gorund` next to the running executable, else whatever `PATH` finds
fn gorund_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("gorund")))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from("gorund"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ClientConfig;
    use tempfile::TempDir;

    fn unreachable(socket: PathBuf) -> GorunError {
        GorunError::ChannelUnreachable {
            socket,
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    #[tokio::test]
    async fn declined_start_returns_original_error() {
        let dir = TempDir::new().unwrap();
        let paths = ConfigManager::with_working_dir(dir.path().to_path_buf());
        let socket = dir.path().join("gorun.sock");
        let client = Client::new(&socket);

        for auto_start in [AutoStart::Never, AutoStart::Prompt] {
            let config = Config {
                client: ClientConfig {
                    auto_start,
                    ..ClientConfig::default()
                },
                ..Config::default()
            };
            let err = start_daemon(
                &UiContext::non_interactive(),
                &paths,
                &config,
                &client,
                unreachable(socket.clone()),
            )
            .await
            .unwrap_err();
            assert!(err.is_unreachable());
        }
    }

    #[tokio::test]
    async fn wait_gives_up_without_server() {
        let dir = TempDir::new().unwrap();
        let client = Client::new(dir.path().join("gorun.sock"));

        let err = wait_until_reachable(&client).await.unwrap_err();
        assert!(err.to_string().contains("did not start listening"));
    }
}
