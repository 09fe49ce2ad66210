//! Daemon pid persistence

use crate::error::{GorunError, GorunResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// A file holding the decimal pid of the running daemon
///
/// A missing file means "not running"; it is not an error.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Create a handle for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the pid file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored pid, `None` if the file does not exist
    pub async fn read(&self) -> GorunResult<Option<i32>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GorunError::io(
                    format!("reading pid file {}", self.path.display()),
                    e,
                ))
            }
        };

        let pid: i32 = content
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| GorunError::InvalidPidFile {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if pid <= 0 {
            return Err(GorunError::InvalidPidFile {
                path: self.path.clone(),
                reason: format!("pid {} is not positive", pid),
            });
        }

        Ok(Some(pid))
    }

    /// Store `pid`, replacing any previous value
    pub async fn write(&self, pid: i32) -> GorunResult<()> {
        fs::write(&self.path, pid.to_string()).await.map_err(|e| {
            GorunError::io(format!("writing pid file {}", self.path.display()), e)
        })
    }

    /// Delete the pid file
    pub async fn remove(&self) -> GorunResult<()> {
        fs::remove_file(&self.path).await.map_err(|e| {
            GorunError::io(format!("removing pid file {}", self.path.display()), e)
        })
    }
}
