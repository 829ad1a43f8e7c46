// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fleet_core::Clock;
use fleet_engine::{Applier, CommitGate, EngineError, Ledger};
use fleet_storage::Spool;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::client::IpcClient;
use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/fleet)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the IPC spool
    pub spool_path: PathBuf,
    pub ipc_timeout: Duration,
    pub down_cache: Duration,
    pub spool_grace: Duration,
    pub spool_max_bytes: u64,
    pub spool_drain_max: usize,
    pub claim_ttl: Duration,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::at(env::state_dir()?);
        if let Some(socket) = env::ipc_socket() {
            config.socket_path = socket;
        }
        config.ipc_timeout = env::ipc_timeout();
        config.down_cache = env::ipc_down_cache();
        config.spool_grace = env::spool_grace();
        config.spool_max_bytes = env::spool_max_bytes();
        config.spool_drain_max = env::spool_drain_max();
        config.claim_ttl = env::claim_ttl();
        Ok(config)
    }

    /// Default layout and tunables under `state_dir`.
    pub fn at(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            socket_path: state_dir.join("ipc.sock"),
            lock_path: state_dir.join("fleetd.pid"),
            log_path: state_dir.join("fleetd.log"),
            spool_path: state_dir.join("ipc-spool.jsonl"),
            ipc_timeout: env::DEFAULT_IPC_TIMEOUT,
            down_cache: env::DEFAULT_DOWN_CACHE,
            spool_grace: env::DEFAULT_SPOOL_GRACE,
            spool_max_bytes: env::DEFAULT_SPOOL_MAX_BYTES,
            spool_drain_max: env::DEFAULT_SPOOL_DRAIN_MAX,
            claim_ttl: env::DEFAULT_CLAIM_TTL,
            state_dir,
        }
    }

    /// Open the task ledger under the state root.
    pub fn ledger<C: Clock>(&self, clock: C) -> Result<Ledger<C>, EngineError> {
        Ledger::open(&self.state_dir, clock, self.claim_ttl)
    }

    /// The spool shares the ledger's claim directory for its drain claim.
    pub fn spool<C: Clock>(&self, ledger: &Ledger<C>) -> Spool<C> {
        Spool::new(&self.spool_path, self.spool_max_bytes, ledger.claims.clone(), ledger.clock.clone())
    }

    pub fn client<C: Clock>(&self, clock: C) -> IpcClient<C> {
        IpcClient::new(&self.socket_path, self.ipc_timeout, self.down_cache, clock)
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Applies operations received over the socket
    pub applier: Applier,
}

/// Result of daemon startup: the daemon state and the bound socket.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to hand to [`crate::Server`]
    pub listener: UnixListener,
}

impl DaemonState {
    pub(crate) fn new(config: Config, lock_file: File, commits: Arc<dyn CommitGate>) -> Result<Self, LifecycleError> {
        let ledger = config.ledger(fleet_core::SystemClock)?;
        Ok(Self { config, lock_file, applier: Applier::new(ledger, commits) })
    }

    /// Shutdown the daemon gracefully.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        remove_if_exists(&self.config.socket_path, "socket");
        remove_if_exists(&self.config.lock_path, "PID");

        // Lock file is released when self.lock_file is dropped
        info!("Daemon shutdown complete");
        Ok(())
    }
}

fn remove_if_exists(path: &Path, what: &str) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove {} file", what);
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
