// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock snapshot over declared ownership of busy tasks.
//!
//! Directory claims are coarsened to their top-level segment, so `src/ui` and
//! `src/api` both lock `src`. File claims lock the exact normalized path and
//! also mark their top-level directory so a later directory claim sees them.
//! A task with any `owner_files` is locked by files alone.

use std::collections::{BTreeSet, HashMap};

use fleet_core::Task;

/// Normalize a declared path: forward slashes, no `./` or leading `/`, no
/// trailing `/`, no empty segments.
pub fn normalize_path(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Top-level segment of a declared path (`src/components` -> `src`).
pub fn top_dir(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.split_once('/') {
        Some((top, _)) => top.to_string(),
        None => normalized,
    }
}

/// Top-level directory of a file path; root-level files have none.
fn file_top_dir(path: &str) -> Option<String> {
    normalize_path(path).split_once('/').map(|(top, _)| top.to_string())
}

/// Resources a task claims.
enum Claims {
    Files(Vec<String>),
    Dirs(Vec<String>),
    Nothing,
}

fn claims_of(task: &Task) -> Claims {
    let files: Vec<String> =
        task.owner_files.iter().map(|f| normalize_path(f)).filter(|f| !f.is_empty()).collect();
    if !files.is_empty() {
        return Claims::Files(files);
    }
    let dirs: Vec<String> =
        task.owner_dirs.iter().map(|d| top_dir(d)).filter(|d| !d.is_empty()).collect();
    if !dirs.is_empty() {
        return Claims::Dirs(dirs);
    }
    Claims::Nothing
}

/// Snapshot of claimed directories and files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    pub locked_dirs: BTreeSet<String>,
    pub locked_files: BTreeSet<String>,
    pub locked_file_top_dirs: BTreeSet<String>,
}

impl LockState {
    pub fn is_empty(&self) -> bool {
        self.locked_dirs.is_empty() && self.locked_files.is_empty()
    }

    /// Add a task's claims to the snapshot.
    pub fn claim(&mut self, task: &Task) {
        match claims_of(task) {
            Claims::Files(files) => {
                for file in files {
                    if let Some(top) = file_top_dir(&file) {
                        self.locked_file_top_dirs.insert(top);
                    }
                    self.locked_files.insert(file);
                }
            }
            Claims::Dirs(dirs) => self.locked_dirs.extend(dirs),
            Claims::Nothing => {}
        }
    }

    /// Whether `task` would overlap anything already claimed.
    pub fn conflicts_with(&self, task: &Task) -> bool {
        match claims_of(task) {
            Claims::Files(files) => files.iter().any(|file| {
                self.locked_files.contains(file)
                    || file_top_dir(file).is_some_and(|top| self.locked_dirs.contains(&top))
            }),
            Claims::Dirs(dirs) => dirs
                .iter()
                .any(|dir| self.locked_dirs.contains(dir) || self.locked_file_top_dirs.contains(dir)),
            Claims::Nothing => false,
        }
    }
}

/// Build the snapshot from busy tasks.
pub fn build_lock_state<'a>(busy: impl IntoIterator<Item = &'a Task>) -> LockState {
    let mut state = LockState::default();
    for task in busy {
        state.claim(task);
    }
    state
}

pub fn has_conflict(task: &Task, state: &LockState) -> bool {
    state.conflicts_with(task)
}

/// Number of resource keys claimed by more than one of `tasks`.
///
/// Observability only; overlapping declarations are not rejected here.
pub fn count_conflicts<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> usize {
    let mut holders: HashMap<String, usize> = HashMap::new();
    for task in tasks {
        let keys: BTreeSet<String> = match claims_of(task) {
            Claims::Files(files) => files.into_iter().map(|f| format!("file:{f}")).collect(),
            Claims::Dirs(dirs) => dirs.into_iter().map(|d| format!("dir:{d}")).collect(),
            Claims::Nothing => BTreeSet::new(),
        };
        for key in keys {
            *holders.entry(key).or_default() += 1;
        }
    }
    holders.values().filter(|count| **count > 1).count()
}

#[cfg(test)]
#[path = "lock_state_tests.rs"]
mod tests;
