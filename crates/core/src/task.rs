// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and status vocabulary.

use crate::id::{SlaveId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Status of a task.
///
/// `queued → running → needs_judge → {done | rework | blocked | failed}`,
/// with `paused` as an administrative hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    NeedsJudge,
    Rework,
    Blocked,
    Failed,
    Done,
    Paused,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 8] = [
        TaskStatus::Queued,
        TaskStatus::Running,
        TaskStatus::NeedsJudge,
        TaskStatus::Rework,
        TaskStatus::Blocked,
        TaskStatus::Failed,
        TaskStatus::Done,
        TaskStatus::Paused,
    ];

    /// Busy statuses hold a worker and/or a resource claim.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            TaskStatus::Running
                | TaskStatus::NeedsJudge
                | TaskStatus::Rework
                | TaskStatus::Blocked
                | TaskStatus::Paused
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}

crate::simple_display! {
    TaskStatus {
        Queued => "queued",
        Running => "running",
        NeedsJudge => "needs_judge",
        Rework => "rework",
        Blocked => "blocked",
        Failed => "failed",
        Done => "done",
        Paused => "paused",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.to_string() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Token/cost accounting reported by workers and the judge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub tokens: f64,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_tokens: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_cost: Option<f64>,
}

impl Usage {
    /// Fold a later report into this one, keeping judge fields already known.
    pub fn merge(self, later: Usage) -> Usage {
        Usage {
            tokens: later.tokens,
            cost: later.cost,
            judge_tokens: later.judge_tokens.or(self.judge_tokens),
            judge_cost: later.judge_cost.or(self.judge_cost),
        }
    }
}

/// The unit of work.
///
/// Persisted as one JSON document per task, always as a complete replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Set once a worker has been shown this task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_dirs: Vec<String>,
    /// When non-empty, takes precedence over `owner_dirs` for locking.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_slave_id: Option<SlaveId>,
    /// Preferred worker when the task goes back to the queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_slave_id: Option<SlaveId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_main_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_committed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_checked_out_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_checked_out_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Task {
    /// A fresh queued task with no ownership or assignment.
    pub fn new(id: impl Into<TaskId>, prompt: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            status: TaskStatus::Queued,
            title: None,
            prompt: Some(prompt.into()),
            prompted_at: None,
            owner_dirs: Vec::new(),
            owner_files: Vec::new(),
            assigned_slave_id: None,
            resume_slave_id: None,
            base_main_sha: None,
            slave_commit_sha: None,
            slave_committed_at: None,
            judge_checked_out_sha: None,
            judge_checked_out_at: None,
            usage: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    /// Whether the task declares any directory or file ownership.
    pub fn declares_ownership(&self) -> bool {
        !self.owner_dirs.is_empty() || !self.owner_files.is_empty()
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            id: TaskId = "task-1",
        }
        set {
            status: TaskStatus = TaskStatus::Queued,
            owner_dirs: Vec<String> = Vec::new(),
            owner_files: Vec<String> = Vec::new(),
        }
        option {
            title: String = None,
            prompt: String = Some("implement the change".to_string()),
            prompted_at: DateTime<Utc> = None,
            assigned_slave_id: SlaveId = None,
            resume_slave_id: SlaveId = None,
            base_main_sha: String = Some("0000000".to_string()),
            slave_commit_sha: String = None,
            slave_committed_at: DateTime<Utc> = None,
            judge_checked_out_sha: String = None,
            judge_checked_out_at: DateTime<Utc> = None,
            usage: Usage = None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TaskBuilder {
    pub fn dirs(self, dirs: &[&str]) -> Self {
        self.owner_dirs(dirs.iter().map(|d| d.to_string()).collect())
    }

    pub fn files(self, files: &[&str]) -> Self {
        self.owner_files(files.iter().map(|f| f.to_string()).collect())
    }

    /// Mark as running on `slave`.
    pub fn running_on(self, slave: &str) -> Self {
        self.status(TaskStatus::Running).assigned_slave_id(slave)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
