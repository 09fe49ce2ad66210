//! Run command - resolve a package through gorund and exec it

use super::autostart::start_daemon;
use crate::cli::args::RunArgs;
use crate::config::{Config, ConfigManager, DIRECTORY_ENV_KEY};
use crate::error::{GorunError, GorunResult};
use crate::ui::UiContext;
use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Execute the run command
///
/// Only returns on failure: on success the process image is replaced.
pub async fn execute(
    args: RunArgs,
    ctx: &UiContext,
    paths: &ConfigManager,
    config: &Config,
) -> GorunResult<()> {
    let executable = resolve(&args.package, ctx, paths, config).await?;
    debug!("Executing {}", executable.display());

    let err = Command::new(&executable).args(&args.args).exec();
    Err(GorunError::SpawnFailed {
        command: executable.display().to_string(),
        source: err,
    })
}

/// Path of the cached executable for `package` in the current directory
pub(crate) async fn resolve(
    package: &str,
    ctx: &UiContext,
    paths: &ConfigManager,
    config: &Config,
) -> GorunResult<PathBuf> {
    let client = super::client(paths, config);
    let env = current_request_env()?;

    match client.get_executable(package, env.clone()).await {
        Err(e) if e.is_unreachable() => {
            start_daemon(ctx, paths, config, &client, e).await?;
            client.get_executable(package, env).await
        }
        result => result,
    }
}

/// The environment sent along with a request
pub(crate) fn current_request_env() -> GorunResult<Vec<String>> {
    let cwd = std::env::current_dir()
        .map_err(|e| GorunError::io("getting current directory", e))?;
    Ok(request_env(std::env::vars_os(), &cwd))
}

/// Render `vars` as `KEY=VALUE` entries, adding `PWD` if it is missing
///
/// Only the request carries the extra entry; the executed program sees
/// the environment gorun was started with.
fn request_env(vars: impl IntoIterator<Item = (OsString, OsString)>, cwd: &Path) -> Vec<String> {
    let mut env: Vec<String> = vars
        .into_iter()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
        .collect();

    let has_directory = env
        .iter()
        .any(|entry| entry.split_once('=').is_some_and(|(k, _)| k == DIRECTORY_ENV_KEY));
    if !has_directory {
        env.push(format!("{}={}", DIRECTORY_ENV_KEY, cwd.display()));
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::protocol::value_from_env;

    fn vars(entries: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        entries
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    #[test]
    fn request_env_keeps_existing_pwd() {
        let env = request_env(vars(&[("HOME", "/home/me"), ("PWD", "/src/app")]), Path::new("/other"));
        assert_eq!(env, vec!["HOME=/home/me", "PWD=/src/app"]);
    }

    #[test]
    fn request_env_adds_missing_pwd() {
        let env = request_env(vars(&[("HOME", "/home/me")]), Path::new("/src/app"));
        assert_eq!(value_from_env("PWD", &env), "/src/app");
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn values_with_equals_survive() {
        let env = request_env(vars(&[("GOFLAGS", "-tags=dev"), ("PWD", "/x")]), Path::new("/x"));
        assert_eq!(value_from_env("GOFLAGS", &env), "-tags=dev");
    }
}
