// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One JSON file per task.
//!
//! Files are named `<task-id>.json` under the store directory. Every save is
//! a complete replace, and nothing reaches disk without passing validation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fleet_core::{validate_record, Task, TaskId, ValidationReport};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::atomic::write_atomic;

/// Errors from task store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid task {id}: {}", errors.join("; "))]
    Invalid { id: String, errors: Vec<String> },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io { path: path.to_path_buf(), source }
    }
}

/// Directory-backed task store.
#[derive(Debug, Clone)]
pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &TaskId) -> Result<PathBuf, StoreError> {
        let raw = id.as_str();
        if raw.contains(['/', '\\']) || raw.starts_with('.') {
            return Err(StoreError::Invalid {
                id: raw.to_string(),
                errors: vec!["id: must be a plain file name".to_string()],
            });
        }
        Ok(self.dir.join(format!("{}.json", raw)))
    }

    /// Load one task. `Ok(None)` when no record exists.
    ///
    /// A record that exists but fails validation is an error here; only
    /// [`TaskStore::list`] skips bad records.
    pub fn load(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let path = self.path_for(id)?;
        match fs::read(&path) {
            Ok(bytes) => parse_record(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Every valid task, ordered by file name.
    ///
    /// Unreadable, unparsable or invalid records are logged and excluded.
    pub fn list(&self) -> Result<Vec<Task>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "json")
                    && !path
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
            })
            .collect();
        paths.sort();

        let mut tasks = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable task record");
                    continue;
                }
            };
            match parse_record(&bytes) {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping invalid task record");
                }
            }
        }
        Ok(tasks)
    }

    /// Validate and persist `task`, replacing any previous record.
    ///
    /// Returns the validation report so callers can surface warnings.
    pub fn save(&self, task: &Task) -> Result<ValidationReport, StoreError> {
        let path = self.path_for(&task.id)?;
        let value = serde_json::to_value(task)?;
        let report = validate_record(&value);
        if !report.is_valid() {
            return Err(StoreError::Invalid {
                id: task.id.to_string(),
                errors: report.errors,
            });
        }
        if !report.warnings.is_empty() {
            debug!(task_id = %task.id, warnings = ?report.warnings, "saving task with warnings");
        }

        let mut bytes = serde_json::to_vec_pretty(&value)?;
        bytes.push(b'\n');
        write_atomic(&path, &bytes).map_err(|e| StoreError::io(&path, e))?;
        Ok(report)
    }

    pub fn exists(&self, id: &TaskId) -> Result<bool, StoreError> {
        Ok(self.path_for(id)?.exists())
    }
}

fn parse_record(bytes: &[u8]) -> Result<Task, StoreError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let report = validate_record(&value);
    if !report.is_valid() {
        let id = value.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        return Err(StoreError::Invalid { id, errors: report.errors });
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
