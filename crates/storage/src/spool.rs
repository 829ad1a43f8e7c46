// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable store-and-forward queue for operations that could not reach the
//! transport.
//!
//! The spool is one JSONL file of `{ts, type, payload}` entries, oldest first.
//! Appends and rewrites happen under an exclusive `fs2` lock on a sidecar
//! `.lock` file. Total size is capped: when an append pushes the file over
//! the cap, the oldest entries are discarded.
//!
//! Draining is at-least-once. A drain pass holds the `spool-drain` claim,
//! moves the spool aside to `<spool>.draining`, replays entries without any
//! lock held, then merges retained entries back in front of whatever was
//! appended meanwhile. A crashed drain leaves the `.draining` file behind and
//! the next pass (after the claim TTL) picks it up.

use std::fs::{self, OpenOptions};
use std::future::Future;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_core::{Clock, SystemClock};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::claim::{Acquire, ClaimError, ClaimManager};

const DRAIN_CLAIM_KEY: &str = "spool-drain";
const DRAIN_CLAIM_TTL: Duration = Duration::from_secs(300);

/// Errors from spool operations
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spool entry of {size} bytes exceeds the {cap} byte cap")]
    EntryTooLarge { size: u64, cap: u64 },

    #[error("claim error: {0}")]
    Claim(#[from] ClaimError),
}

impl SpoolError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SpoolError::Io { path: path.to_path_buf(), source }
    }
}

/// One queued operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolEntry {
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

/// What a drain handler did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Applied; remove the entry.
    Done,
    /// Type not recognized; drop the entry.
    Unknown,
    /// Failed; keep the entry for the next drain.
    Retry,
}

/// Counters from one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub replayed: usize,
    pub retained: usize,
    pub dropped_invalid: usize,
    pub dropped_unknown: usize,
    /// Another drain held the claim; nothing was done.
    pub skipped: bool,
}

/// Size-capped JSONL spool.
#[derive(Clone)]
pub struct Spool<C: Clock = SystemClock> {
    path: PathBuf,
    max_bytes: u64,
    claims: ClaimManager<C>,
    clock: C,
}

/// Held while reading or rewriting the spool; unlocked on drop.
struct SpoolLock {
    file: fs::File,
}

impl Drop for SpoolLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl<C: Clock> Spool<C> {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, claims: ClaimManager<C>, clock: C) -> Self {
        Self { path: path.into(), max_bytes, claims, clock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn draining_path(&self) -> PathBuf {
        self.path.with_extension("draining")
    }

    fn lock(&self) -> Result<SpoolLock, SpoolError> {
        let path = self.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SpoolError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| SpoolError::io(&path, e))?;
        file.lock_exclusive().map_err(|e| SpoolError::io(&path, e))?;
        Ok(SpoolLock { file })
    }

    /// Append an operation, trimming the oldest entries if over the cap.
    pub fn append(&self, kind: &str, payload: Value) -> Result<(), SpoolError> {
        let entry = SpoolEntry { ts: self.clock.utc(), kind: kind.to_string(), payload };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        if line.len() as u64 > self.max_bytes {
            return Err(SpoolError::EntryTooLarge { size: line.len() as u64, cap: self.max_bytes });
        }

        let _lock = self.lock()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SpoolError::io(&self.path, e))?;
        file.write_all(&line).map_err(|e| SpoolError::io(&self.path, e))?;
        let size = file.metadata().map_err(|e| SpoolError::io(&self.path, e))?.len();
        drop(file);

        debug!(kind, size, "spooled operation");
        if size > self.max_bytes {
            let lines = self.read_lines(&self.path)?;
            self.write_capped(lines)?;
        }
        Ok(())
    }

    /// Current entries, oldest first (unparsable lines skipped).
    pub fn entries(&self) -> Result<Vec<SpoolEntry>, SpoolError> {
        let _lock = self.lock()?;
        let mut lines = self.read_lines(&self.draining_path())?;
        lines.extend(self.read_lines(&self.path)?);
        Ok(lines.iter().filter_map(|line| serde_json::from_str(line).ok()).collect())
    }

    pub fn is_empty(&self) -> Result<bool, SpoolError> {
        Ok(self.entries()?.is_empty())
    }

    /// Replay up to `max_entries` entries through `handler`.
    ///
    /// Unparsable entries and [`Replay::Unknown`] entries are dropped;
    /// [`Replay::Retry`] entries and anything beyond `max_entries` are kept in
    /// order. The spool file is deleted once nothing remains.
    pub async fn drain<F, Fut>(&self, max_entries: usize, mut handler: F) -> Result<DrainReport, SpoolError>
    where
        F: FnMut(SpoolEntry) -> Fut,
        Fut: Future<Output = Replay>,
    {
        let _claim = match self.claims.acquire(DRAIN_CLAIM_KEY, DRAIN_CLAIM_TTL)? {
            Acquire::Held(claim) => claim,
            Acquire::Busy { .. } => {
                debug!("spool drain already in progress");
                return Ok(DrainReport { skipped: true, ..DrainReport::default() });
            }
        };

        let draining = self.draining_path();
        {
            let _lock = self.lock()?;
            if !draining.exists() {
                match fs::rename(&self.path, &draining) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DrainReport::default()),
                    Err(e) => return Err(SpoolError::io(&self.path, e)),
                }
            } else {
                info!(path = %draining.display(), "resuming interrupted spool drain");
            }
        }

        let lines = self.read_lines(&draining)?;
        let mut report = DrainReport::default();
        let mut retained = Vec::new();
        for (i, line) in lines.into_iter().enumerate() {
            if i >= max_entries {
                retained.push(line);
                continue;
            }
            let entry: SpoolEntry = match serde_json::from_str(&line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "dropping unparsable spool entry");
                    report.dropped_invalid += 1;
                    continue;
                }
            };
            let kind = entry.kind.clone();
            match handler(entry).await {
                Replay::Done => report.replayed += 1,
                Replay::Unknown => {
                    warn!(kind, "dropping spool entry of unknown type");
                    report.dropped_unknown += 1;
                }
                Replay::Retry => retained.push(line),
            }
        }
        report.retained = retained.len();

        {
            let _lock = self.lock()?;
            let mut merged = retained;
            merged.extend(self.read_lines(&self.path)?);
            self.write_capped(merged)?;
            fs::remove_file(&draining).map_err(|e| SpoolError::io(&draining, e))?;
        }

        info!(
            replayed = report.replayed,
            retained = report.retained,
            dropped = report.dropped_invalid + report.dropped_unknown,
            "drained spool"
        );
        Ok(report)
    }

    fn read_lines(&self, path: &Path) -> Result<Vec<String>, SpoolError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(SpoolError::io(path, e)),
        }
    }

    /// Rewrite the spool with the newest lines that fit under the cap.
    ///
    /// Caller holds the spool lock.
    fn write_capped(&self, lines: Vec<String>) -> Result<(), SpoolError> {
        let mut kept = Vec::new();
        let mut total = 0u64;
        for line in lines.iter().rev() {
            let size = line.len() as u64 + 1;
            if total + size > self.max_bytes {
                break;
            }
            total += size;
            kept.push(line.as_str());
        }
        let dropped = lines.len() - kept.len();
        if dropped > 0 {
            warn!(dropped, cap = self.max_bytes, "spool over cap, discarded oldest entries");
        }

        if kept.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(SpoolError::io(&self.path, e)),
            };
        }

        let mut body = String::with_capacity(total as usize);
        for line in kept.iter().rev() {
            body.push_str(line);
            body.push('\n');
        }
        write_atomic(&self.path, body.as_bytes()).map_err(|e| SpoolError::io(&self.path, e))
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
