//! Task lifecycle specs
//!
//! Drive a task from the queue through review with the control loop and the
//! operation applier, and check what each step leaves behind.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_engine::{run_tick, JudgeGate, Phase, SlaveRoster, TickInputs};

use crate::prelude::*;

struct Roster(Vec<SlaveId>);

impl SlaveRoster for Roster {
    fn available(&self) -> Vec<SlaveId> {
        self.0.clone()
    }

    fn heartbeats(&self) -> HashMap<SlaveId, DateTime<Utc>> {
        HashMap::new()
    }
}

fn inputs() -> TickInputs {
    TickInputs {
        slave_cap: 4,
        phase: Phase::Execute,
        token_burn_per_min: 0.0,
        burn_cap: 100.0,
        stale_after: Duration::from_secs(120),
    }
}

#[test]
fn task_moves_from_queue_to_done() {
    let fleet = Fleet::new();
    let applier = fleet.applier();
    applier.apply(&create(queued_dirs("t1", &["src"]))).unwrap();

    let outcome = run_tick(&fleet.ledger, &inputs(), &Roster(vec![SlaveId::new("c1")])).unwrap();
    assert_eq!(outcome.assigned.len(), 1);

    applier
        .apply(&Operation::Handoff(Handoff {
            task_id: TaskId::new("t1"),
            slave_id: SlaveId::new("c1"),
            commit_sha: Some("abc123".to_string()),
            summary: None,
        }))
        .unwrap();
    let reviewed =
        JudgeGate::checkout(&fleet.ledger, &TaskId::new("t1"), &SlaveId::new("judge"), &NoCommitGate).unwrap().unwrap();
    assert_eq!(reviewed.judge_checked_out_sha.as_deref(), Some("abc123"));

    applier.apply(&set_status("t1", TaskStatus::Done, Some("judge"))).unwrap();

    assert_eq!(fleet.task("t1").status, TaskStatus::Done);
    assert_eq!(
        fleet.audit_kinds(),
        vec![
            AuditKind::TaskCreated,
            AuditKind::TaskAssigned,
            AuditKind::TaskNeedsJudge,
            AuditKind::TaskHandoff,
            AuditKind::TaskJudgeCheckout,
            AuditKind::TaskDone,
        ]
    );
}

#[test]
fn blocked_task_spawns_one_followup_and_remembers_worker() {
    let fleet = Fleet::with_tasks(&[queued_dirs("t1", &["src"])]);
    run_tick(&fleet.ledger, &inputs(), &Roster(vec![SlaveId::new("c4")])).unwrap();
    let applier = fleet.applier();

    let data = applier.apply(&set_status("t1", TaskStatus::Blocked, Some("c4"))).unwrap();
    applier.apply(&set_status("t1", TaskStatus::Blocked, Some("c4"))).unwrap();

    let task = fleet.task("t1");
    assert_eq!(task.assigned_slave_id, None);
    assert_eq!(task.resume_slave_id, Some(SlaveId::new("c4")));
    let followups: Vec<Task> =
        fleet.ledger.store.list().unwrap().into_iter().filter(|t| t.id != "t1").collect();
    assert_eq!(followups.len(), 1);
    assert_eq!(followups[0].status, TaskStatus::Queued);
    assert_eq!(followups[0].owner_dirs, vec!["src".to_string()]);
    assert_eq!(data["followup"]["id"], json!(followups[0].id));
}

#[test]
fn failed_task_forgets_its_workers() {
    let fleet = Fleet::with_tasks(&[queued_dirs("t1", &["src"])]);
    run_tick(&fleet.ledger, &inputs(), &Roster(vec![SlaveId::new("c4")])).unwrap();

    fleet.applier().apply(&set_status("t1", TaskStatus::Failed, Some("c4"))).unwrap();

    let task = fleet.task("t1");
    assert_eq!(task.assigned_slave_id, None);
    assert_eq!(task.resume_slave_id, None);
    assert_eq!(fleet.audit_kinds().last(), Some(&AuditKind::TaskFailed));
}
