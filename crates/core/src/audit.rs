// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit event vocabulary.

use crate::id::{SlaveId, TaskId};
use crate::task::{TaskStatus, Usage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audit event type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    TaskCreated,
    TaskAssigned,
    TaskPrompted,
    TaskJudgeCheckout,
    TaskNote,
    TaskHandoff,
    TaskStatus,
    TaskRework,
    TaskBlocked,
    TaskFailed,
    TaskNeedsJudge,
    TaskDone,
}

impl AuditKind {
    /// Tag for a status transition into `status`.
    pub fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Rework => AuditKind::TaskRework,
            TaskStatus::Blocked => AuditKind::TaskBlocked,
            TaskStatus::Failed => AuditKind::TaskFailed,
            TaskStatus::NeedsJudge => AuditKind::TaskNeedsJudge,
            TaskStatus::Done => AuditKind::TaskDone,
            _ => AuditKind::TaskStatus,
        }
    }
}

crate::simple_display! {
    AuditKind {
        TaskCreated => "TASK_CREATED",
        TaskAssigned => "TASK_ASSIGNED",
        TaskPrompted => "TASK_PROMPTED",
        TaskJudgeCheckout => "TASK_JUDGE_CHECKOUT",
        TaskNote => "TASK_NOTE",
        TaskHandoff => "TASK_HANDOFF",
        TaskStatus => "TASK_STATUS",
        TaskRework => "TASK_REWORK",
        TaskBlocked => "TASK_BLOCKED",
        TaskFailed => "TASK_FAILED",
        TaskNeedsJudge => "TASK_NEEDS_JUDGE",
        TaskDone => "TASK_DONE",
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AuditKind,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<SlaveId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl AuditEvent {
    pub fn new(ts: DateTime<Utc>, kind: AuditKind, msg: impl Into<String>) -> Self {
        Self { ts, kind, msg: msg.into(), slave_id: None, task_id: None, data: None }
    }

    pub fn task(mut self, id: &TaskId) -> Self {
        self.task_id = Some(id.clone());
        self
    }

    pub fn slave(mut self, id: Option<&SlaveId>) -> Self {
        self.slave_id = id.cloned();
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach usage snapshot fields (`tokens`, `cost`, ...) to `data`.
    pub fn usage(mut self, usage: Option<&Usage>) -> Self {
        let Some(usage) = usage else {
            return self;
        };
        let Ok(Value::Object(fields)) = serde_json::to_value(usage) else {
            return self;
        };
        match self.data {
            Some(Value::Object(ref mut existing)) => existing.extend(fields),
            _ => self.data = Some(Value::Object(fields)),
        }
        self
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
