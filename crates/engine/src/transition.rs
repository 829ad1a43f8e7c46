// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The only writer of task status.

use fleet_core::{AuditEvent, AuditKind, Clock, SlaveId, Task, TaskId, TaskStatus};
use serde_json::json;
use tracing::info;

use crate::{EngineError, Ledger};

/// Result of a status change.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub task: Task,
    pub from: TaskStatus,
    /// Follow-up spawned when the task became blocked.
    pub followup: Option<Task>,
}

/// Move `task` to `to`, apply the side effects of the target status, persist,
/// and audit.
///
/// - `rework` clears `prompted_at`; the worker keeps the assignment.
/// - `blocked` releases the worker into `resume_slave_id`, and on first entry
///   queues a follow-up carrying the same ownership and base commit.
/// - `failed` releases the worker with no resume preference.
pub fn transition<C: Clock>(
    ledger: &Ledger<C>,
    mut task: Task,
    to: TaskStatus,
    actor: Option<&SlaveId>,
) -> Result<Transition, EngineError> {
    let from = task.status;
    task.status = to;

    let mut followup = None;
    match to {
        TaskStatus::Rework => task.prompted_at = None,
        TaskStatus::Blocked => {
            if task.resume_slave_id.is_none() {
                task.resume_slave_id = task.assigned_slave_id.clone();
            }
            task.assigned_slave_id = None;
            task.prompted_at = None;
            if from != TaskStatus::Blocked {
                followup = Some(followup_for(&task));
            }
        }
        TaskStatus::Failed => {
            task.assigned_slave_id = None;
            task.resume_slave_id = None;
            task.prompted_at = None;
        }
        _ => {}
    }

    ledger.store.save(&task)?;
    if let Some(followup) = &followup {
        ledger.store.save(followup)?;
    }

    info!(task_id = %task.id, %from, %to, "task status changed");
    ledger.record(
        AuditEvent::new(ledger.clock.utc(), AuditKind::for_status(to), format!("{}: {} -> {}", task.id, from, to))
            .task(&task.id)
            .slave(actor.or(task.assigned_slave_id.as_ref()))
            .data(json!({ "from": from, "to": to }))
            .usage(task.usage.as_ref()),
    )?;

    if let Some(followup) = &followup {
        info!(task_id = %followup.id, blocked = %task.id, "queued follow-up for blocked task");
        ledger.record(
            AuditEvent::new(ledger.clock.utc(), AuditKind::TaskCreated, format!("follow-up for {}", task.id))
                .task(&followup.id)
                .data(json!({ "followupOf": task.id })),
        )?;
    }

    Ok(Transition { task, from, followup })
}

fn followup_for(blocked: &Task) -> Task {
    let mut followup = Task::new(
        TaskId::followup(&blocked.id),
        format!(
            "Follow-up for blocked task {}. Read its notes, resolve what blocked it, and finish the work.",
            blocked.id
        ),
    );
    followup.title = Some(match &blocked.title {
        Some(title) => format!("Follow-up: {title}"),
        None => format!("Follow-up: {}", blocked.id),
    });
    followup.owner_dirs = blocked.owner_dirs.clone();
    followup.owner_files = blocked.owner_files.clone();
    followup.base_main_sha = blocked.base_main_sha.clone();
    followup
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
