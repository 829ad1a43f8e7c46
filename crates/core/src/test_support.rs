// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Task, TaskStatus};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for tasks and ownership paths.
pub mod strategies {
    use crate::task::TaskStatus;
    use proptest::prelude::*;

    pub fn arb_status() -> impl Strategy<Value = TaskStatus> {
        proptest::sample::select(TaskStatus::ALL.to_vec())
    }

    /// Relative path of one to three short segments, e.g. `ab/c/d.rs`.
    pub fn arb_rel_path() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-d]{1,2}", 1..=3).prop_map(|segments| segments.join("/"))
    }
}

// ── Task factories ──────────────────────────────────────────────────────

/// Queued task owning the given directories.
pub fn queued_dirs(id: &str, dirs: &[&str]) -> Task {
    Task::builder().id(id).dirs(dirs).build()
}

/// Queued task owning the given files.
pub fn queued_files(id: &str, files: &[&str]) -> Task {
    Task::builder().id(id).files(files).build()
}

/// Busy task in `status` held by `slave`.
pub fn busy(id: &str, status: TaskStatus, slave: &str) -> Task {
    Task::builder().id(id).status(status).assigned_slave_id(slave).build()
}
