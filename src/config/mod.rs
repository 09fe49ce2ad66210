//! Configuration and filesystem layout for gorun
//!
//! Everything gorun persists lives under one working directory: one
//! subdirectory per build key, the daemon socket, pid file and log file.

pub mod schema;

pub use schema::Config;

use crate::error::{GorunError, GorunResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Overrides the working directory (cache root)
pub const WORKING_DIR_ENV: &str = "GORUN_WORKING_DIR";

/// Any non-empty value enables debug logging
pub const DEBUG_ENV: &str = "GORUN_DEBUG";

/// Overrides the config file location
pub const CONFIG_ENV: &str = "GORUN_CONFIG";

/// Switches the client from run to rebuild
pub const REBUILD_ENV: &str = "GORUN_REBUILD";

/// Environment key the server reads the caller's directory from
pub const DIRECTORY_ENV_KEY: &str = "PWD";

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    working_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager rooted at the default working directory
    pub fn new() -> Self {
        Self::with_working_dir(Self::default_working_dir())
    }

    /// Create a config manager rooted at a custom working directory
    pub fn with_working_dir(working_dir: PathBuf) -> Self {
        let config_path = working_dir.join("config.toml");
        Self {
            working_dir,
            config_path,
        }
    }

    /// Use a custom config file path
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = path;
        self
    }

    /// `$GORUN_WORKING_DIR`, else `<user cache dir>/gorun-cache`
    pub fn default_working_dir() -> PathBuf {
        match std::env::var_os(WORKING_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("gorun-cache"),
        }
    }

    /// Whether `GORUN_DEBUG` is set to a non-empty value
    pub fn debug_enabled() -> bool {
        std::env::var_os(DEBUG_ENV).is_some_and(|v| !v.is_empty())
    }

    /// Root directory for artifacts and daemon state
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Path of the config file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Socket the server listens on
    pub fn socket_path(&self, config: &Config) -> PathBuf {
        config
            .server
            .socket
            .clone()
            .unwrap_or_else(|| self.working_dir.join("gorun.sock"))
    }

    /// File holding the daemon's pid
    pub fn pid_file(&self) -> PathBuf {
        self.working_dir.join("gorun.pid")
    }

    /// File receiving the daemon's stdout and stderr
    pub fn log_file(&self) -> PathBuf {
        self.working_dir.join("gorun.log")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> GorunResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file {} not found, using defaults", self.config_path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            GorunError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;

        toml::from_str(&content).map_err(|e| GorunError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Ensure the working directory exists with owner-only permissions
    pub async fn ensure_working_dir(&self) -> GorunResult<()> {
        fs::create_dir_all(&self.working_dir).await.map_err(|e| {
            GorunError::io(
                format!("creating directory {}", self.working_dir.display()),
                e,
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&self.working_dir, perms)
                .map_err(|e| GorunError::io("setting working dir permissions", e))?;
        }

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
