// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claim-guarded entry points for acting on an assignment.
//!
//! Assignment can race across processes, so anything that is about to show a
//! task to a worker (or check it out for a reviewer) takes the per-task claim
//! and re-reads the record first.

use fleet_core::{AuditEvent, AuditKind, Clock, SlaveId, Task, TaskId, TaskStatus};
use fleet_storage::Claim;
use serde_json::json;
use tracing::{debug, info};

use crate::apply::CommitGate;
use crate::assign::task_claim_key;
use crate::{EngineError, Ledger};

/// Why a gate declined to proceed. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// Another process holds the task claim.
    Claimed,
    Missing,
    WrongStatus(TaskStatus),
    AssignedElsewhere(Option<SlaveId>),
    AlreadyPrompted,
    NoCommit,
    AlreadyCheckedOut,
}

fleet_core::simple_display! {
    Skip {
        Claimed => "claimed elsewhere",
        Missing => "task missing",
        WrongStatus(..) => "wrong status",
        AssignedElsewhere(..) => "assigned to another worker",
        AlreadyPrompted => "already prompted",
        NoCommit => "no worker commit",
        AlreadyCheckedOut => "already checked out",
    }
}

fn claim_task<C: Clock>(ledger: &Ledger<C>, task_id: &TaskId) -> Result<Option<Claim>, EngineError> {
    Ok(ledger.claims.acquire(&task_claim_key(task_id), ledger.claim_ttl)?.into_claim())
}

/// Exclusive right to prompt one worker with one task.
///
/// Holds the task claim until dropped or [`PromptTicket::mark_prompted`].
pub struct PromptTicket<'a, C: Clock> {
    ledger: &'a Ledger<C>,
    task: Task,
    _claim: Claim,
}

impl<'a, C: Clock> PromptTicket<'a, C> {
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Record that the worker has been shown the task.
    ///
    /// Re-reads the record so only `prompted_at` changes. Skips when the task
    /// left running/rework or changed worker since [`PromptGate::begin`].
    pub fn mark_prompted(self) -> Result<Result<Task, Skip>, EngineError> {
        let Some(mut task) = self.ledger.store.load(&self.task.id)? else {
            return Ok(Err(Skip::Missing));
        };
        if !matches!(task.status, TaskStatus::Running | TaskStatus::Rework) {
            return Ok(Err(Skip::WrongStatus(task.status)));
        }
        if task.assigned_slave_id != self.task.assigned_slave_id {
            return Ok(Err(Skip::AssignedElsewhere(task.assigned_slave_id)));
        }

        task.prompted_at = Some(self.ledger.clock.utc());
        self.ledger.store.save(&task)?;
        info!(task_id = %task.id, "task prompted");
        self.ledger.record(
            AuditEvent::new(self.ledger.clock.utc(), AuditKind::TaskPrompted, format!("prompted {}", task.id))
                .task(&task.id)
                .slave(task.assigned_slave_id.as_ref()),
        )?;
        Ok(Ok(task))
    }
}

pub struct PromptGate;

impl PromptGate {
    /// Confirm under the task claim that `slave` should be prompted now: the
    /// task is running or in rework, assigned to `slave`, and not yet
    /// prompted.
    pub fn begin<'a, C: Clock>(
        ledger: &'a Ledger<C>,
        task_id: &TaskId,
        slave: &SlaveId,
    ) -> Result<Result<PromptTicket<'a, C>, Skip>, EngineError> {
        let Some(claim) = claim_task(ledger, task_id)? else {
            debug!(task_id = %task_id, "prompt skipped: task claimed");
            return Ok(Err(Skip::Claimed));
        };
        let Some(task) = ledger.store.load(task_id)? else {
            return Ok(Err(Skip::Missing));
        };
        if !matches!(task.status, TaskStatus::Running | TaskStatus::Rework) {
            return Ok(Err(Skip::WrongStatus(task.status)));
        }
        if task.assigned_slave_id.as_ref() != Some(slave) {
            return Ok(Err(Skip::AssignedElsewhere(task.assigned_slave_id)));
        }
        if task.prompted_at.is_some() {
            return Ok(Err(Skip::AlreadyPrompted));
        }
        Ok(Ok(PromptTicket { ledger, task, _claim: claim }))
    }
}

pub struct JudgeGate;

impl JudgeGate {
    /// Check out the worker's commit for review and record it.
    ///
    /// Requires `needs_judge` and a recorded worker commit. Skips when that
    /// commit is already the checked-out one.
    pub fn checkout<C: Clock>(
        ledger: &Ledger<C>,
        task_id: &TaskId,
        judge: &SlaveId,
        commits: &dyn CommitGate,
    ) -> Result<Result<Task, Skip>, EngineError> {
        let Some(_claim) = claim_task(ledger, task_id)? else {
            return Ok(Err(Skip::Claimed));
        };
        let Some(mut task) = ledger.store.load(task_id)? else {
            return Ok(Err(Skip::Missing));
        };
        if task.status != TaskStatus::NeedsJudge {
            return Ok(Err(Skip::WrongStatus(task.status)));
        }
        let Some(sha) = task.slave_commit_sha.clone() else {
            return Ok(Err(Skip::NoCommit));
        };
        if task.judge_checked_out_sha.as_deref() == Some(sha.as_str()) {
            return Ok(Err(Skip::AlreadyCheckedOut));
        }

        commits
            .checkout(&task, &sha)
            .map_err(|message| EngineError::Gate { id: task.id.clone(), message })?;

        task.judge_checked_out_sha = Some(sha.clone());
        task.judge_checked_out_at = Some(ledger.clock.utc());
        ledger.store.save(&task)?;
        info!(task_id = %task.id, %sha, judge = %judge, "checked out for review");
        ledger.record(
            AuditEvent::new(ledger.clock.utc(), AuditKind::TaskJudgeCheckout, format!("{} checked out {}", judge, sha))
                .task(&task.id)
                .slave(Some(judge))
                .data(json!({ "sha": sha })),
        )?;
        Ok(Ok(task))
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
