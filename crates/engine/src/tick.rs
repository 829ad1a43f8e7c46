// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One pass of the control loop: measure, cap, assign.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_core::{Clock, SlaveId, Task, TaskStatus};
use tracing::info;

use crate::assign::assign_queued;
use crate::heartbeat::stale_slaves;
use crate::lock_state::{build_lock_state, count_conflicts};
use crate::scheduler::{compute_cap, CapInputs, Phase};
use crate::{EngineError, Ledger};

/// Where the control loop learns which workers exist and when they last
/// reported.
pub trait SlaveRoster {
    fn available(&self) -> Vec<SlaveId>;
    fn heartbeats(&self) -> HashMap<SlaveId, DateTime<Utc>>;
}

/// Operator-supplied knobs for a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickInputs {
    pub slave_cap: usize,
    pub phase: Phase,
    pub token_burn_per_min: f64,
    pub burn_cap: f64,
    pub stale_after: Duration,
}

/// Measurements and capacity for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickPlan {
    pub cap: usize,
    /// Workers holding a busy task (stale ones excluded).
    pub busy: usize,
    /// Queued tasks with no lock conflict.
    pub ready: usize,
    /// Share of queued tasks blocked by the lock snapshot.
    pub conflict_rate: f64,
    /// Tasks waiting for review.
    pub integration_backlog: usize,
    /// Resource keys claimed by more than one busy task.
    pub overlapping_claims: usize,
    /// How many more workers may start this tick.
    pub free_budget: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub plan: TickPlan,
    pub stale: HashSet<SlaveId>,
    pub assigned: Vec<Task>,
}

/// Derive scheduler inputs from a task snapshot and size this tick.
pub fn plan_tick(tasks: &[Task], inputs: &TickInputs, stale: &HashSet<SlaveId>) -> TickPlan {
    let live_busy: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.is_busy())
        .filter(|task| !task.assigned_slave_id.as_ref().is_some_and(|slave| stale.contains(slave)))
        .collect();
    let busy = live_busy.iter().filter_map(|task| task.assigned_slave_id.as_ref()).collect::<HashSet<_>>().len();

    let locks = build_lock_state(live_busy.iter().copied());
    let queued: Vec<&Task> = tasks.iter().filter(|task| task.status == TaskStatus::Queued).collect();
    let blocked = queued.iter().filter(|task| locks.conflicts_with(task)).count();
    let ready = queued.len() - blocked;
    let conflict_rate = if queued.is_empty() { 0.0 } else { blocked as f64 / queued.len() as f64 };
    let integration_backlog = tasks.iter().filter(|task| task.status == TaskStatus::NeedsJudge).count();

    let cap = compute_cap(&CapInputs {
        slave_cap: inputs.slave_cap,
        ready_count: ready,
        phase: inputs.phase,
        conflict_rate,
        integration_backlog,
        token_burn_per_min: inputs.token_burn_per_min,
        burn_cap: inputs.burn_cap,
    });

    TickPlan {
        cap,
        busy,
        ready,
        conflict_rate,
        integration_backlog,
        overlapping_claims: count_conflicts(live_busy.iter().copied()),
        free_budget: cap.saturating_sub(busy),
    }
}

/// Run one tick: detect stale workers, plan, and assign up to the budget.
pub fn run_tick<C: Clock>(
    ledger: &Ledger<C>,
    inputs: &TickInputs,
    roster: &dyn SlaveRoster,
) -> Result<TickOutcome, EngineError> {
    let tasks = ledger.store.list()?;
    let stale = stale_slaves(&roster.heartbeats(), ledger.clock.utc(), inputs.stale_after);
    let plan = plan_tick(&tasks, inputs, &stale);

    let busy: HashSet<&SlaveId> = tasks
        .iter()
        .filter(|task| task.is_busy())
        .filter_map(|task| task.assigned_slave_id.as_ref())
        .filter(|slave| !stale.contains(*slave))
        .collect();
    let free: Vec<SlaveId> =
        roster.available().into_iter().filter(|slave| !busy.contains(slave)).take(plan.free_budget).collect();

    let assigned = if free.is_empty() { Vec::new() } else { assign_queued(ledger, &tasks, &free, &stale)? };
    info!(
        cap = plan.cap,
        busy = plan.busy,
        ready = plan.ready,
        stale = stale.len(),
        assigned = assigned.len(),
        "tick"
    );
    Ok(TickOutcome { plan, stale, assigned })
}

#[cfg(test)]
#[path = "tick_tests.rs"]
mod tests;
