//! In-memory build cache with per-key build barriers
//!
//! Locking is two-level. The registry lock guards only the key → entry map
//! and is never held across a compile. Each entry's build barrier is held
//! for the whole of a compile, so one key never compiles twice at once
//! while unrelated keys compile in parallel.

use crate::build::compiler::Compiler;
use crate::build::key::{BuildContext, BuildKey};
use crate::error::{GorunError, GorunResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// State guarded by an entry's build barrier
#[derive(Debug, Default)]
struct BuildState {
    /// Artifact handed out to callers; `None` until the first successful build
    current: Option<PathBuf>,

    /// Diagnostics of the most recent failed attempt
    last_failure: Option<String>,
}

/// One cacheable build target
#[derive(Debug, Default)]
struct CacheEntry {
    barrier: tokio::sync::Mutex<BuildState>,

    /// Completed compile attempts; only incremented with the barrier held
    attempts: AtomicU64,
}

/// Maps build contexts to compiled executables
pub struct BuildCache {
    cache_dir: PathBuf,
    compiler: Arc<dyn Compiler>,
    entries: Mutex<HashMap<BuildKey, Arc<CacheEntry>>>,
}

impl BuildCache {
    /// Create a cache storing artifacts under `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            compiler,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Root directory for artifacts
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Return the executable for `context`, compiling it if needed.
    ///
    /// Callers arriving while a compile for the same key is in flight wait
    /// for it and share its outcome, success or failure. A failed compile
    /// publishes nothing, so the next independent call compiles again.
    pub async fn resolve(&self, context: &BuildContext) -> GorunResult<PathBuf> {
        let key = context.key();
        let entry = self.entry_or_insert(&key);

        let seen = entry.attempts.load(Ordering::Acquire);
        let mut state = entry.barrier.lock().await;

        if let Some(path) = &state.current {
            debug!("Path found {} in cache", path.display());
            return Ok(path.clone());
        }

        if entry.attempts.load(Ordering::Acquire) > seen {
            if let Some(output) = &state.last_failure {
                debug!("Sharing failed compile of {} with waiting caller", context);
                return Err(GorunError::CompileFailed {
                    output: output.clone(),
                });
            }
        }

        info!("Must compile {} ({})", context, key);
        let result = self.compile(context, &key).await;
        entry.attempts.fetch_add(1, Ordering::Release);

        match result {
            Ok(path) => {
                state.current = Some(path.clone());
                state.last_failure = None;
                Ok(path)
            }
            Err(e) => {
                state.last_failure = Some(failure_output(&e));
                Err(e)
            }
        }
    }

    /// Compile `context` again and publish the new artifact.
    ///
    /// Fails without compiling when `context` has never been built
    /// successfully. The previous artifact is left untouched so paths
    /// already handed out stay executable. On failure the previous
    /// artifact stays current.
    pub async fn rebuild(&self, context: &BuildContext) -> GorunResult<PathBuf> {
        let key = context.key();
        info!("Re-compiling {} ({})", context, key);

        let nothing_to_rebuild = || GorunError::NothingToRebuild {
            package: context.package.clone(),
            directory: context.directory.display().to_string(),
        };

        let entry = self.entry(&key).ok_or_else(nothing_to_rebuild)?;
        let mut state = entry.barrier.lock().await;
        if state.current.is_none() {
            return Err(nothing_to_rebuild());
        }

        let result = self.compile(context, &key).await;
        entry.attempts.fetch_add(1, Ordering::Release);

        let path = result?;
        state.current = Some(path.clone());
        state.last_failure = None;
        Ok(path)
    }

    fn entry(&self, key: &BuildKey) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn entry_or_insert(&self, key: &BuildKey) -> Arc<CacheEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.clone()).or_default().clone()
    }

    /// Compile into a fresh, randomly named file under `<cache_dir>/<key>/`
    async fn compile(&self, context: &BuildContext, key: &BuildKey) -> GorunResult<PathBuf> {
        let output_dir = self.cache_dir.join(key);
        fs::create_dir_all(&output_dir).await.map_err(|e| {
            GorunError::io(format!("creating directory {}", output_dir.display()), e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            fs::set_permissions(&output_dir, perms)
                .await
                .map_err(|e| GorunError::io("setting artifact dir permissions", e))?;
        }

        let path = output_dir.join(Uuid::new_v4().simple().to_string());
        self.compiler.compile(context, &path).await?;
        Ok(path)
    }
}

fn failure_output(err: &GorunError) -> String {
    match err {
        GorunError::CompileFailed { output } => output.clone(),
        other => other.to_string(),
    }
}
