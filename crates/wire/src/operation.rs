// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations carried in the envelope `type` / `payload` pair.

use fleet_core::{SlaveId, Task, TaskId, TaskStatus, Usage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, RequestEnvelope};

/// `task.create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub task: Task,
}

/// `task.status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdate {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<SlaveId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// `task.note`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNote {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<SlaveId>,
    pub note: String,
}

/// `task.handoff`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handoff {
    pub task_id: TaskId,
    pub slave_id: SlaveId,
    /// Commit the worker produced; asked from the commit gate when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A request the daemon knows how to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Ping,
    CreateTask(CreateTask),
    SetStatus(TaskStatusUpdate),
    AddNote(TaskNote),
    Handoff(Handoff),
}

impl Operation {
    pub const PING: &'static str = "ping";
    pub const TASK_CREATE: &'static str = "task.create";
    pub const TASK_STATUS: &'static str = "task.status";
    pub const TASK_NOTE: &'static str = "task.note";
    pub const TASK_HANDOFF: &'static str = "task.handoff";

    /// Every `type` with a typed payload.
    pub const KINDS: [&'static str; 5] =
        [Self::PING, Self::TASK_CREATE, Self::TASK_STATUS, Self::TASK_NOTE, Self::TASK_HANDOFF];

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Ping => Self::PING,
            Operation::CreateTask(_) => Self::TASK_CREATE,
            Operation::SetStatus(_) => Self::TASK_STATUS,
            Operation::AddNote(_) => Self::TASK_NOTE,
            Operation::Handoff(_) => Self::TASK_HANDOFF,
        }
    }

    /// Task the operation targets, if any.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Operation::Ping => None,
            Operation::CreateTask(op) => Some(&op.task.id),
            Operation::SetStatus(op) => Some(&op.task_id),
            Operation::AddNote(op) => Some(&op.task_id),
            Operation::Handoff(op) => Some(&op.task_id),
        }
    }

    /// Validate an untyped `type` / `payload` pair.
    pub fn from_parts(kind: &str, payload: Value) -> Result<Self, ProtocolError> {
        match kind {
            Self::PING => Ok(Operation::Ping),
            Self::TASK_CREATE => parse(kind, payload).map(Operation::CreateTask),
            Self::TASK_STATUS => parse(kind, payload).map(Operation::SetStatus),
            Self::TASK_NOTE => parse(kind, payload).map(Operation::AddNote),
            Self::TASK_HANDOFF => parse(kind, payload).map(Operation::Handoff),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }

    pub fn payload(&self) -> Result<Value, ProtocolError> {
        let value = match self {
            Operation::Ping => Value::Object(Default::default()),
            Operation::CreateTask(op) => serde_json::to_value(op)?,
            Operation::SetStatus(op) => serde_json::to_value(op)?,
            Operation::AddNote(op) => serde_json::to_value(op)?,
            Operation::Handoff(op) => serde_json::to_value(op)?,
        };
        Ok(value)
    }

    pub fn into_request(&self, id: impl Into<String>) -> Result<RequestEnvelope, ProtocolError> {
        Ok(RequestEnvelope::new(id, self.kind(), self.payload()?))
    }
}

impl TryFrom<&RequestEnvelope> for Operation {
    type Error = ProtocolError;

    fn try_from(request: &RequestEnvelope) -> Result<Self, Self::Error> {
        Operation::from_parts(&request.kind, request.payload.clone())
    }
}

fn parse<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload)
        .map_err(|source| ProtocolError::InvalidPayload { kind: kind.to_string(), source })
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
