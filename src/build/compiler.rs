//! Compiler abstraction
//!
//! The build cache only needs "produce an executable at this path"; the
//! toolchain behind it is a replaceable strategy.

use crate::build::key::BuildContext;
use crate::config::schema::BuildConfig;
use crate::error::{GorunError, GorunResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// Produces a native executable for a build context
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile `context` to `output`.
    ///
    /// On failure returns [`GorunError::CompileFailed`] carrying the
    /// toolchain's diagnostics.
    async fn compile(&self, context: &BuildContext, output: &Path) -> GorunResult<()>;
}

/// Runs `go build -o <output> <package>` in the context directory
#[derive(Debug, Clone)]
pub struct GoCompiler {
    go_binary: String,
    flags: Vec<String>,
}

impl GoCompiler {
    /// Create a compiler using `go` from `PATH`
    pub fn new() -> Self {
        Self::from_config(&BuildConfig::default())
    }

    /// Create a compiler from the `[build]` config section
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            go_binary: config.go_binary.clone(),
            flags: config.flags.clone(),
        }
    }

    fn args(&self, context: &BuildContext, output: &Path) -> Vec<String> {
        let mut args = vec!["build".to_string()];
        args.extend(self.flags.iter().cloned());
        args.push("-o".to_string());
        args.push(output.to_string_lossy().into_owned());
        args.push(context.package.clone());
        args
    }
}

impl Default for GoCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Compiler for GoCompiler {
    async fn compile(&self, context: &BuildContext, output: &Path) -> GorunResult<()> {
        let args = self.args(context, output);
        info!(
            "Running {} {} at {}",
            self.go_binary,
            args.join(" "),
            context.directory.display()
        );

        let result = Command::new(&self.go_binary)
            .args(&args)
            .current_dir(&context.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                // A missing toolchain or directory is a compile failure for the caller
                warn!("Failed to run {}: {}", self.go_binary, e);
                return Err(GorunError::CompileFailed {
                    output: format!("failed to run {}: {}", self.go_binary, e),
                });
            }
        };

        if result.status.success() {
            return Ok(());
        }

        let output = combined_output(&result.stdout, &result.stderr);
        warn!("Failed to build: {}", output);
        Err(GorunError::CompileFailed { output })
    }
}

/// Join stdout and stderr into one diagnostic string
pub(crate) fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim_end().is_empty(), stderr.trim_end().is_empty()) {
        (true, _) => stderr.into_owned(),
        (false, true) => stdout.into_owned(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr),
    }
}
