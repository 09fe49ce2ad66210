//! Configuration schema for gorun
//!
//! Configuration is read from `<working dir>/config.toml` when present.
//! Every field is optional; missing sections fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// RPC server settings
    pub server: ServerConfig,

    /// Client settings
    pub client: ClientConfig,

    /// Compiler settings
    pub build: BuildConfig,

    /// Daemon supervision settings
    pub daemon: DaemonConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Daemon log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// RPC server settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket path (defaults to `<working dir>/gorun.sock`)
    pub socket: Option<PathBuf>,
}

/// What the client does when gorund is not reachable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoStart {
    /// Ask before starting the daemon
    #[default]
    Prompt,
    /// Start the daemon without asking
    Always,
    /// Never start the daemon
    Never,
}

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Seconds to wait for a single request, including compilation
    pub request_timeout_secs: u64,

    /// Daemon auto-start policy
    pub auto_start: AutoStart,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            auto_start: AutoStart::Prompt,
        }
    }
}

/// Compiler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Go toolchain binary
    pub go_binary: String,

    /// Extra flags passed to `go build`
    pub flags: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            go_binary: "go".to_string(),
            flags: vec![],
        }
    }
}

/// Daemon supervision settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Interval between liveness polls after SIGTERM
    pub stop_poll_interval_ms: u64,

    /// Number of liveness polls before escalating to SIGKILL
    pub stop_attempts: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            stop_poll_interval_ms: 100,
            stop_attempts: 50,
        }
    }
}
