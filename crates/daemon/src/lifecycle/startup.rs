// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;

use fleet_engine::CommitGate;
use fs2::FileExt;
use tokio::net::UnixListener;
use tracing::{info, warn};

use super::{Config, DaemonState, LifecycleError, StartupResult};

/// Start the daemon
pub async fn startup(config: &Config, commits: Arc<dyn CommitGate>) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, commits).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Another daemon owns these files if we failed to acquire the lock.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config, commits: Arc<dyn CommitGate>) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for the lock file)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Open durable state
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let daemon = DaemonState::new(config.clone(), lock_file, commits)?;

    // 4. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        info!(path = %config.socket_path.display(), "removing stale socket");
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(socket = %config.socket_path.display(), pid = std::process::id(), "daemon started");
    Ok(StartupResult { daemon, listener })
}

fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.lock_path] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to clean up after startup failure");
            }
        }
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
