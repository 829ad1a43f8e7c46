// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fleet_core::{TaskId, TaskStatus};
use fleet_storage::{ClaimError, JournalError, StoreError};
use thiserror::Error;

/// Errors from engine operations.
///
/// Contention (a busy claim, a lock conflict) is never an error for the
/// scheduler and gates; those paths skip and report through their return
/// values. Operation writes wait for the task claim and fail with
/// [`EngineError::Busy`] only when it stays held.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task already exists: {id} ({status})")]
    Duplicate { id: TaskId, status: TaskStatus },

    #[error("task busy: {0}")]
    Busy(TaskId),

    #[error("no commit available for task {0}")]
    NoCommit(TaskId),

    #[error("commit gate failed for task {id}: {message}")]
    Gate { id: TaskId, message: String },

    #[error("task {id} is {status}, expected {expected}")]
    WrongStatus { id: TaskId, status: TaskStatus, expected: TaskStatus },
}
