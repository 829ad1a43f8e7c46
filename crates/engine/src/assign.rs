// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binding queued tasks to free workers.

use std::collections::HashSet;

use fleet_core::{AuditEvent, AuditKind, Clock, SlaveId, Task, TaskId, TaskStatus};
use fleet_storage::Acquire;
use tracing::{debug, info};

use crate::lock_state::build_lock_state;
use crate::{EngineError, Ledger};

/// Claim key serializing every decision about one task.
pub(crate) fn task_claim_key(id: &TaskId) -> String {
    format!("task-{id}")
}

/// Assign queued tasks to free workers, in the order given.
///
/// A worker is busy while it holds a busy task, unless it is listed in
/// `stale` (its task is treated as abandoned and stops locking resources).
/// Each candidate is re-read under its task claim before binding, so
/// concurrent callers working from the same snapshot assign a task at most
/// once. Returns the tasks that were assigned, as persisted.
pub fn assign_queued<C: Clock>(
    ledger: &Ledger<C>,
    tasks: &[Task],
    available: &[SlaveId],
    stale: &HashSet<SlaveId>,
) -> Result<Vec<Task>, EngineError> {
    let is_live_busy = |task: &&Task| {
        task.is_busy() && !task.assigned_slave_id.as_ref().is_some_and(|slave| stale.contains(slave))
    };
    let busy_slaves: HashSet<&SlaveId> =
        tasks.iter().filter(is_live_busy).filter_map(|task| task.assigned_slave_id.as_ref()).collect();

    let mut free: Vec<SlaveId> = Vec::new();
    for slave in available {
        if !busy_slaves.contains(slave) && !free.contains(slave) {
            free.push(slave.clone());
        }
    }

    let mut locks = build_lock_state(tasks.iter().filter(is_live_busy));
    let mut assigned = Vec::new();

    for candidate in tasks.iter().filter(|task| task.status == TaskStatus::Queued) {
        if free.is_empty() {
            break;
        }
        if locks.conflicts_with(candidate) {
            debug!(task_id = %candidate.id, "skipping queued task: lock conflict");
            continue;
        }

        let _claim = match ledger.claims.acquire(&task_claim_key(&candidate.id), ledger.claim_ttl)? {
            Acquire::Held(claim) => claim,
            Acquire::Busy { .. } => {
                debug!(task_id = %candidate.id, "skipping queued task: claimed elsewhere");
                continue;
            }
        };

        // The snapshot may be stale; only the stored record counts.
        let Some(mut task) = ledger.store.load(&candidate.id)? else {
            continue;
        };
        if task.status != TaskStatus::Queued {
            debug!(task_id = %task.id, status = %task.status, "skipping task: no longer queued");
            continue;
        }
        if locks.conflicts_with(&task) {
            continue;
        }

        let slave = match task.resume_slave_id.as_ref().and_then(|id| free.iter().position(|s| s == id)) {
            Some(i) => free.remove(i),
            None => free.remove(0),
        };
        task.status = TaskStatus::Running;
        task.assigned_slave_id = Some(slave.clone());
        task.resume_slave_id = None;
        ledger.store.save(&task)?;

        info!(task_id = %task.id, slave_id = %slave, "assigned task");
        ledger.record(
            AuditEvent::new(ledger.clock.utc(), AuditKind::TaskAssigned, format!("{} -> {}", task.id, slave))
                .task(&task.id)
                .slave(Some(&slave)),
        )?;

        locks.claim(&task);
        assigned.push(task);
    }

    Ok(assigned)
}

#[cfg(test)]
#[path = "assign_tests.rs"]
mod tests;
