//! Run command for gorund - serve the build cache in the foreground

use crate::build::{BuildCache, GoCompiler};
use crate::config::{Config, ConfigManager};
use crate::error::GorunResult;
use crate::rpc::Server;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// Execute the run command, returning once a shutdown signal arrives
pub async fn execute(paths: &ConfigManager, config: &Config) -> GorunResult<()> {
    let compiler = Arc::new(GoCompiler::from_config(&config.build));
    let cache = Arc::new(BuildCache::new(paths.working_dir(), compiler));

    info!("Caching builds in {}", cache.cache_dir().display());
    Server::new(paths.socket_path(config), cache)
        .run(shutdown_signal())
        .await
}

/// Completes on SIGTERM or SIGINT
async fn shutdown_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
    }
}
