//! Error types for gorun
//!
//! All modules use `GorunResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for gorun operations
pub type GorunResult<T> = Result<T, GorunError>;

/// All errors that can occur in gorun
#[derive(Error, Debug)]
pub enum GorunError {
    // Build errors
    #[error("failed to compile:\n{output}")]
    CompileFailed { output: String },

    #[error("attempted recompilation of {package} in {directory} when there was no initial compile")]
    NothingToRebuild { package: String, directory: String },

    // Daemon errors
    #[error("daemon already running pid {0}")]
    DaemonAlreadyRunning(i32),

    #[error("no pid found")]
    DaemonNotRunning,

    #[error("Invalid pid file {path}: {reason}")]
    InvalidPidFile { path: PathBuf, reason: String },

    #[error("Process control failed: {context}")]
    ProcessControl {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {command}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Channel errors
    #[error("gorund is not reachable at {}", socket.display())]
    ChannelUnreachable {
        socket: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl GorunError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a process control error
    pub fn process(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessControl {
            context: context.into(),
            source,
        }
    }

    /// Check if the error means the daemon socket could not be reached
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::ChannelUnreachable { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ChannelUnreachable { .. } => Some("Run: gorund start"),
            Self::DaemonAlreadyRunning(_) => Some("Run: gorund stop"),
            Self::DaemonNotRunning => Some("Run: gorund start"),
            Self::NothingToRebuild { .. } => Some("Run the package once with gorun before rebuilding"),
            _ => None,
        }
    }
}
