// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

pub const DEFAULT_IPC_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_DOWN_CACHE: Duration = Duration::from_millis(5000);
pub const DEFAULT_SPOOL_GRACE: Duration = Duration::from_millis(10_000);
pub const DEFAULT_SPOOL_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_SPOOL_DRAIN_MAX: usize = 200;
pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_millis(60_000);

/// Resolve state directory: FLEET_STATE_DIR > XDG_STATE_HOME/fleet > ~/.local/state/fleet
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("FLEET_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("fleet"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/fleet"))
}

/// Socket path override (`FLEET_IPC_SOCKET`).
pub fn ipc_socket() -> Option<PathBuf> {
    std::env::var("FLEET_IPC_SOCKET").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Per-request client timeout
pub fn ipc_timeout() -> Duration {
    millis("FLEET_IPC_TIMEOUT_MS").unwrap_or(DEFAULT_IPC_TIMEOUT)
}

/// How long an unreachable socket is reported down without retrying.
pub fn ipc_down_cache() -> Duration {
    millis("FLEET_IPC_DOWN_CACHE_MS").unwrap_or(DEFAULT_DOWN_CACHE)
}

/// How long transport failures must persist before the gateway spools.
pub fn spool_grace() -> Duration {
    millis("FLEET_IPC_SPOOL_GRACE_MS").unwrap_or(DEFAULT_SPOOL_GRACE)
}

pub fn spool_max_bytes() -> u64 {
    std::env::var("FLEET_IPC_SPOOL_MAX_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SPOOL_MAX_BYTES)
}

/// Max entries replayed per drain pass
pub fn spool_drain_max() -> usize {
    std::env::var("FLEET_IPC_SPOOL_DRAIN_MAX")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SPOOL_DRAIN_MAX)
}

pub fn claim_ttl() -> Duration {
    millis("FLEET_CLAIM_TTL_MS").unwrap_or(DEFAULT_CLAIM_TTL)
}

/// Log filter directive for `fleetd` (default `info`).
pub fn log_filter() -> String {
    std::env::var("FLEET_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

fn millis(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
