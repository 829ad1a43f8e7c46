// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-lived exclusive claims backed by lock files.
//!
//! A claim is the file `<locks_dir>/<normalized key>.lock`, created with
//! fail-if-exists semantics and holding `{key, lockedAt, pid}`. Claims are
//! advisory and bounded by a TTL: a holder that crashes leaves a file that
//! the next contender reclaims once it is older than the TTL.
//!
//! Within one process, the check-age / reclaim / retry sequence for a key runs
//! under a per-key mutex. Across processes, reclaim renames the stale file
//! aside first and re-checks what it actually moved, so a contender can never
//! delete a lock that was re-created after it looked.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use fleet_core::{Clock, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub key: String,
    /// Epoch milliseconds.
    pub locked_at: u64,
    pub pid: u32,
}

/// Errors from claim operations.
///
/// A held lock is not an error; see [`Acquire::Busy`].
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClaimError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ClaimError::Io { path: path.to_path_buf(), source }
    }
}

/// Result of a claim attempt.
#[derive(Debug)]
pub enum Acquire {
    Held(Claim),
    /// Another live owner holds the key.
    Busy {
        holder: Option<LockRecord>,
        age: Duration,
    },
}

impl Acquire {
    pub fn into_claim(self) -> Option<Claim> {
        match self {
            Acquire::Held(claim) => Some(claim),
            Acquire::Busy { .. } => None,
        }
    }
}

/// A held claim. Released on drop.
#[derive(Debug)]
pub struct Claim {
    path: PathBuf,
    record: LockRecord,
    released: bool,
}

impl Claim {
    pub fn key(&self) -> &str {
        &self.record.key
    }

    pub fn record(&self) -> &LockRecord {
        &self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the lock file.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // Only remove the file if it is still ours; after a TTL reclaim the
        // path may belong to someone else.
        match read_record(&self.path) {
            Some(current) if current != self.record => {
                debug!(key = %self.record.key, "claim was reclaimed by another holder");
                return;
            }
            _ => {}
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(key = %self.record.key, error = %e, "failed to release claim");
            }
        }
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Map a claim key to a safe file stem.
///
/// Keeps `[A-Za-z0-9._-]`, replaces everything else with `_`, and never
/// produces a hidden or empty name.
pub fn normalize_key(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with('.') {
        out.insert(0, '_');
    }
    out
}

/// Hands out claims under one locks directory.
///
/// Cheap to clone; clones share the per-key serialization table.
#[derive(Clone)]
pub struct ClaimManager<C: Clock = SystemClock> {
    dir: PathBuf,
    clock: C,
    guards: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl<C: Clock> ClaimManager<C> {
    pub fn new(dir: impl Into<PathBuf>, clock: C) -> Result<Self, ClaimError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| ClaimError::io(&dir, e))?;
        Ok(Self { dir, clock, guards: Arc::new(Mutex::new(HashMap::new())) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", normalize_key(key)))
    }

    /// Try to take the claim for `key`.
    ///
    /// Returns [`Acquire::Busy`] when a live owner holds it. A lock older than
    /// `ttl` is reclaimed and creation retried once. Filesystem errors other
    /// than "already exists" propagate.
    pub fn acquire(&self, key: &str, ttl: Duration) -> Result<Acquire, ClaimError> {
        let path = self.lock_path(key);
        let guard = self.key_guard(&path);
        let _serialized = guard.lock();

        let mut reclaimed = false;
        loop {
            let record = LockRecord {
                key: key.to_string(),
                locked_at: self.clock.epoch_ms(),
                pid: std::process::id(),
            };
            match create_exclusive(&path, &record) {
                Ok(()) => {
                    debug!(key, "claim acquired");
                    return Ok(Acquire::Held(Claim { path, record, released: false }));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(ClaimError::io(&path, e)),
            }

            let Some(locked_at) = lock_timestamp(&path)? else {
                // Released between our create and our read.
                if reclaimed {
                    return Ok(Acquire::Busy { holder: None, age: Duration::ZERO });
                }
                reclaimed = true;
                continue;
            };
            let age = self.age_of(locked_at);
            if age <= ttl || reclaimed {
                debug!(key, age_ms = age.as_millis() as u64, "claim busy");
                return Ok(Acquire::Busy { holder: read_record(&path), age });
            }

            reclaimed = true;
            if !self.reclaim(&path, ttl)? {
                return Ok(Acquire::Busy { holder: read_record(&path), age: Duration::ZERO });
            }
        }
    }

    fn age_of(&self, locked_at: u64) -> Duration {
        Duration::from_millis(self.clock.epoch_ms().saturating_sub(locked_at))
    }

    /// Move a stale lock aside and delete it.
    ///
    /// Returns false when the file we moved turned out to be fresh (another
    /// contender re-created it in between); it is put back in that case.
    fn reclaim(&self, path: &Path, ttl: Duration) -> Result<bool, ClaimError> {
        let tomb = path.with_extension(format!(
            "lock.stale.{}.{}",
            std::process::id(),
            self.clock.epoch_ms()
        ));
        match fs::rename(path, &tomb) {
            Ok(()) => {}
            // Someone else already reclaimed or released it.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(ClaimError::io(path, e)),
        }

        let moved_at = lock_timestamp(&tomb)?;
        let still_stale = moved_at.map_or(true, |at| self.age_of(at) > ttl);
        if !still_stale {
            // hard_link fails if the path was taken again; then the fresh
            // owner we displaced has lost its file, which the TTL bounds.
            if let Err(e) = fs::hard_link(&tomb, path) {
                warn!(path = %path.display(), error = %e, "could not restore displaced claim");
            }
        } else {
            info!(path = %path.display(), "reclaimed stale claim");
        }
        if let Err(e) = fs::remove_file(&tomb) {
            warn!(path = %tomb.display(), error = %e, "failed to remove reclaimed lock");
        }
        Ok(still_stale)
    }

    fn key_guard(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut guards = self.guards.lock();
        Arc::clone(guards.entry(path.to_path_buf()).or_default())
    }
}

fn create_exclusive(path: &Path, record: &LockRecord) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let body = serde_json::to_vec(record).map_err(std::io::Error::other)?;
    if let Err(e) = file.write_all(&body) {
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

fn read_record(path: &Path) -> Option<LockRecord> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Lock timestamp in epoch ms: embedded `lockedAt`, else the file mtime.
///
/// `Ok(None)` when the file no longer exists.
fn lock_timestamp(path: &Path) -> Result<Option<u64>, ClaimError> {
    if let Some(record) = read_record(path) {
        return Ok(Some(record.locked_at));
    }
    // Unparsable payload or dangling link: fall back to the entry's own mtime.
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ClaimError::io(path, e)),
    };
    let mtime = meta.modified().map_err(|e| ClaimError::io(path, e))?;
    let ms = mtime.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64;
    Ok(Some(ms))
}

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;
