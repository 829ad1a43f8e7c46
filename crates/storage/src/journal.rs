// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL journals: the audit log and per-task note history.
//!
//! Each append opens, writes one complete line, and closes the file, so the
//! happens-before order of a single writer is the line order on disk.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fleet_core::{AuditEvent, SlaveId, TaskId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JournalError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        JournalError::Io { path: path.to_path_buf(), source }
    }
}

/// Entries read from a journal plus the offset to resume from.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalTail<T> {
    pub entries: Vec<T>,
    pub next_offset: u64,
}

fn append_line<T: Serialize>(path: &Path, entry: &T) -> Result<(), JournalError> {
    let mut line = serde_json::to_vec(entry)?;
    line.push(b'\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| JournalError::io(parent, e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| JournalError::io(path, e))?;
    file.write_all(&line).map_err(|e| JournalError::io(path, e))
}

/// Read complete lines starting at `offset`.
///
/// A trailing line without its newline is left for the next read. Lines that
/// fail to parse are skipped but still consumed.
fn read_from<T: DeserializeOwned>(path: &Path, offset: u64) -> Result<JournalTail<T>, JournalError> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(JournalTail { entries: Vec::new(), next_offset: 0 })
        }
        Err(e) => return Err(JournalError::io(path, e)),
    };
    let len = file.metadata().map_err(|e| JournalError::io(path, e))?.len();
    // Offset past the end means the file was replaced; start over.
    let start = if offset > len {
        debug!(path = %path.display(), offset, len, "journal shrank, reading from start");
        0
    } else {
        offset
    };

    file.seek(SeekFrom::Start(start)).map_err(|e| JournalError::io(path, e))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|e| JournalError::io(path, e))?;

    let complete = buf.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    let mut entries = Vec::new();
    for line in buf[..complete].split(|b| *b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<T>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unparsable journal line"),
        }
    }
    Ok(JournalTail { entries, next_offset: start + complete as u64 })
}

/// Append-only audit log (`audit.jsonl`).
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &AuditEvent) -> Result<(), JournalError> {
        append_line(&self.path, event)
    }

    /// Tail the log from a byte offset previously returned as `next_offset`.
    pub fn read_from(&self, offset: u64) -> Result<JournalTail<AuditEvent>, JournalError> {
        read_from(&self.path, offset)
    }
}

/// One note attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntry {
    pub ts: DateTime<Utc>,
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<SlaveId>,
    pub note: String,
}

/// Per-task note history: `<dir>/<task-id>.jsonl`.
#[derive(Debug, Clone)]
pub struct NoteHistory {
    dir: PathBuf,
}

impl NoteHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, task_id: &TaskId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", crate::claim::normalize_key(task_id.as_str())))
    }

    pub fn append(&self, entry: &NoteEntry) -> Result<(), JournalError> {
        append_line(&self.path_for(&entry.task_id), entry)
    }

    pub fn read(&self, task_id: &TaskId) -> Result<Vec<NoteEntry>, JournalError> {
        Ok(read_from(&self.path_for(task_id), 0)?.entries)
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
