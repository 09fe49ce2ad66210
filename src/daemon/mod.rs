//! Daemon lifecycle: start, stop and status of the background server
//!
//! The daemon is a `gorund run` process spawned by a [`ProcessController`].
//! Its pid is persisted to `gorun.pid` and its output appended to
//! `gorun.log`, both in the working directory.

mod controller;
mod pid_file;

pub use controller::{OsProcessController, ProcessController, StopPolicy};
pub use pid_file::PidFile;

use crate::config::ConfigManager;
use crate::error::{GorunError, GorunResult};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Observed daemon state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    /// Pid file present and the process exists
    Running(i32),
    /// Pid file present but the process is gone
    Stale(i32),
    /// No pid file
    Stopped,
}

/// Supervises the background server process
pub struct Daemon {
    pid_file: PidFile,
    log_file: PathBuf,
    controller: Box<dyn ProcessController>,
}

impl Daemon {
    /// Create a daemon keeping its state in the manager's working directory
    pub fn new(paths: &ConfigManager, controller: Box<dyn ProcessController>) -> Self {
        Self {
            pid_file: PidFile::new(paths.pid_file()),
            log_file: paths.log_file(),
            controller,
        }
    }

    /// Path the daemon's output is appended to
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Start the daemon unless one is already alive
    pub async fn start(&self) -> GorunResult<i32> {
        if let Some(pid) = self.pid_file.read().await? {
            if self.controller.is_alive(pid) {
                return Err(GorunError::DaemonAlreadyRunning(pid));
            }
        }

        let log = self.open_log()?;
        let pid = self.controller.start(log)?;
        self.pid_file.write(pid).await?;

        info!("Started process {}", pid);
        Ok(pid)
    }

    /// Stop the daemon recorded in the pid file
    pub async fn stop(&self) -> GorunResult<i32> {
        let pid = self
            .pid_file
            .read()
            .await?
            .ok_or(GorunError::DaemonNotRunning)?;

        self.controller.stop(pid).await?;
        self.pid_file.remove().await?;

        info!("Stopped {}", pid);
        Ok(pid)
    }

    /// Report whether the daemon is running
    pub async fn status(&self) -> GorunResult<DaemonStatus> {
        Ok(match self.pid_file.read().await? {
            Some(pid) if self.controller.is_alive(pid) => DaemonStatus::Running(pid),
            Some(pid) => DaemonStatus::Stale(pid),
            None => DaemonStatus::Stopped,
        })
    }

    /// Open the log for appending and mark where this run begins
    fn open_log(&self) -> GorunResult<std::fs::File> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(|e| {
                GorunError::io(format!("opening log file {}", self.log_file.display()), e)
            })?;

        writeln!(log, "=== gorund starting at {} ===", Utc::now().to_rfc3339())
            .map_err(|e| GorunError::io("writing log banner", e))?;
        Ok(log)
    }
}
