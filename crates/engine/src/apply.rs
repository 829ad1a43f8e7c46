// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single implementation of every IPC operation.
//!
//! The daemon's handlers, the gateway's direct-write fallback, and spool
//! replay all land here, so an operation has the same effect whichever path
//! delivered it. Operations are delivered at least once; re-applying a
//! create, handoff or note is harmless.
//!
//! Writes to a task record happen under its task claim, the same one the
//! assigner and the gates take, and re-read the record once it is held.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fleet_core::{AuditEvent, AuditKind, Clock, SlaveId, SystemClock, Task, TaskId, TaskStatus};
use fleet_storage::{Acquire, Claim, NoteEntry};
use fleet_wire::{CreateTask, Handoff, Operation, TaskNote, TaskStatusUpdate};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::assign::task_claim_key;
use crate::transition::transition;
use crate::{EngineError, Ledger};

/// How many times a write waits for a busy task claim before giving up.
const CLAIM_ATTEMPTS: u32 = 40;
const CLAIM_RETRY: Duration = Duration::from_millis(5);

/// Source control helper consulted before review.
pub trait CommitGate: Send + Sync {
    /// Commit a worker produced for `task`, if any.
    fn head_commit(&self, task: &Task, slave: &SlaveId) -> Result<Option<String>, String>;

    /// Check out `sha` for a reviewer.
    fn checkout(&self, task: &Task, sha: &str) -> Result<(), String>;
}

/// Gate for deployments without source control integration: workers must
/// report their commit explicitly and checkouts are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCommitGate;

impl CommitGate for NoCommitGate {
    fn head_commit(&self, _task: &Task, _slave: &SlaveId) -> Result<Option<String>, String> {
        Ok(None)
    }

    fn checkout(&self, _task: &Task, _sha: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Applies operations against a [`Ledger`].
#[derive(Clone)]
pub struct Applier<C: Clock = SystemClock> {
    ledger: Ledger<C>,
    commits: Arc<dyn CommitGate>,
}

impl<C: Clock> Applier<C> {
    pub fn new(ledger: Ledger<C>, commits: Arc<dyn CommitGate>) -> Self {
        Self { ledger, commits }
    }

    pub fn ledger(&self) -> &Ledger<C> {
        &self.ledger
    }

    /// Apply one operation and return its response data.
    pub fn apply(&self, op: &Operation) -> Result<Value, EngineError> {
        match op {
            Operation::Ping => Ok(json!({ "pong": true })),
            Operation::CreateTask(op) => self.create(op),
            Operation::SetStatus(op) => self.set_status(op),
            Operation::AddNote(op) => self.note(op),
            Operation::Handoff(op) => self.handoff(op),
        }
    }

    fn create(&self, op: &CreateTask) -> Result<Value, EngineError> {
        let task = &op.task;
        let _claim = self.claim(&task.id)?;
        if let Some(existing) = self.ledger.store.load(&task.id)? {
            if &existing == task {
                info!(task_id = %task.id, "task already created");
                return Ok(json!({ "task": existing }));
            }
            if !existing.status.is_terminal() {
                return Err(EngineError::Duplicate { id: task.id.clone(), status: existing.status });
            }
            info!(task_id = %task.id, status = %existing.status, "replacing finished task");
        }

        let report = self.ledger.store.save(task)?;
        for warning in &report.warnings {
            warn!(task_id = %task.id, %warning, "task saved with warning");
        }
        info!(task_id = %task.id, "task created");
        self.ledger.record(
            AuditEvent::new(self.ledger.clock.utc(), AuditKind::TaskCreated, format!("created {}", task.id))
                .task(&task.id),
        )?;
        Ok(json!({ "task": task }))
    }

    fn set_status(&self, op: &TaskStatusUpdate) -> Result<Value, EngineError> {
        let _claim = self.claim(&op.task_id)?;
        let mut task = self.load(&op.task_id)?;
        if let Some(usage) = op.usage {
            task.usage = Some(match task.usage {
                Some(known) => known.merge(usage),
                None => usage,
            });
        }
        let result = transition(&self.ledger, task, op.status, op.slave_id.as_ref())?;
        Ok(json!({ "task": result.task, "followup": result.followup }))
    }

    fn note(&self, op: &TaskNote) -> Result<Value, EngineError> {
        let task = self.load(&op.task_id)?;
        let now = self.ledger.clock.utc();
        self.ledger.history.append(&NoteEntry {
            ts: now,
            task_id: task.id.clone(),
            slave_id: op.slave_id.clone(),
            note: op.note.clone(),
        })?;
        self.ledger.record(
            AuditEvent::new(now, AuditKind::TaskNote, op.note.clone())
                .task(&task.id)
                .slave(op.slave_id.as_ref()),
        )?;
        Ok(json!({ "taskId": task.id }))
    }

    fn handoff(&self, op: &Handoff) -> Result<Value, EngineError> {
        let _claim = self.claim(&op.task_id)?;
        let mut task = self.load(&op.task_id)?;
        if task.assigned_slave_id.as_ref().is_some_and(|owner| owner != &op.slave_id) {
            warn!(task_id = %task.id, from = %op.slave_id, "handoff from a worker the task is not assigned to");
        }

        let sha = match &op.commit_sha {
            Some(sha) => sha.clone(),
            None => self
                .commits
                .head_commit(&task, &op.slave_id)
                .map_err(|message| EngineError::Gate { id: task.id.clone(), message })?
                .ok_or_else(|| EngineError::NoCommit(task.id.clone()))?,
        };

        // Replayed handoff: already recorded and waiting for review.
        if task.status == TaskStatus::NeedsJudge && task.slave_commit_sha.as_deref() == Some(sha.as_str()) {
            return Ok(json!({ "task": task, "followup": null }));
        }

        let now = self.ledger.clock.utc();
        task.slave_commit_sha = Some(sha.clone());
        task.slave_committed_at = Some(now);
        let result = transition(&self.ledger, task, TaskStatus::NeedsJudge, Some(&op.slave_id))?;
        self.ledger.record(
            AuditEvent::new(now, AuditKind::TaskHandoff, op.summary.clone().unwrap_or_else(|| format!("handoff {sha}")))
                .task(&result.task.id)
                .slave(Some(&op.slave_id))
                .data(json!({ "sha": sha })),
        )?;
        Ok(json!({ "task": result.task, "followup": result.followup }))
    }

    /// Take the task claim, waiting briefly for a current holder.
    fn claim(&self, id: &TaskId) -> Result<Claim, EngineError> {
        let key = task_claim_key(id);
        for attempt in 1..=CLAIM_ATTEMPTS {
            match self.ledger.claims.acquire(&key, self.ledger.claim_ttl)? {
                Acquire::Held(claim) => return Ok(claim),
                Acquire::Busy { .. } if attempt < CLAIM_ATTEMPTS => thread::sleep(CLAIM_RETRY),
                Acquire::Busy { .. } => {}
            }
        }
        warn!(task_id = %id, "task claim still held, giving up");
        Err(EngineError::Busy(id.clone()))
    }

    fn load(&self, id: &TaskId) -> Result<Task, EngineError> {
        self.ledger.store.load(id)?.ok_or_else(|| EngineError::NotFound(id.clone()))
    }
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
