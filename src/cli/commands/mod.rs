//! CLI command implementations

mod autostart;
pub mod rebuild;
pub mod run;
pub mod serve;
pub mod start;
pub mod status;
pub mod stop;

pub use rebuild::execute as rebuild;
pub use run::execute as run;
pub use serve::execute as serve;
pub use start::execute as start;
pub use status::execute as status;
pub use stop::execute as stop;

use crate::config::{Config, ConfigManager, CONFIG_ENV, WORKING_DIR_ENV};
use crate::daemon::{Daemon, OsProcessController, StopPolicy};
use crate::error::{GorunError, GorunResult};
use crate::rpc::Client;
use std::time::Duration;

/// Client for the configured socket and request timeout
pub(crate) fn client(paths: &ConfigManager, config: &Config) -> Client {
    Client::new(paths.socket_path(config))
        .with_timeout(Duration::from_secs(config.client.request_timeout_secs))
}

/// Daemon that re-executes this binary as `<exe> run`
///
/// The child gets the working directory and config path explicitly so it
/// agrees with the caller even if the caller's environment differs.
pub(crate) fn daemon(paths: &ConfigManager, config: &Config) -> GorunResult<Daemon> {
    let exe = std::env::current_exe()
        .map_err(|e| GorunError::io("locating the gorund executable", e))?;

    let controller = OsProcessController::new(exe, ["run"])
        .env(WORKING_DIR_ENV, paths.working_dir())
        .env(CONFIG_ENV, paths.config_path())
        .with_policy(StopPolicy::from_config(&config.daemon));

    Ok(Daemon::new(paths, Box::new(controller)))
}
