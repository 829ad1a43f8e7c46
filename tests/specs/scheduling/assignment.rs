//! Assignment specs
//!
//! Verify that concurrent assigners bind a task at most once, that ownership
//! locks keep overlapping work apart, and that stale workers release theirs.

use std::collections::HashSet;

use fleet_engine::{assign_queued, PromptGate, Skip};

use crate::prelude::*;

#[test]
fn concurrent_assigners_bind_a_task_once() {
    let fleet = Fleet::with_tasks(&[queued_dirs("t1", &["src"])]);
    let snapshot = fleet.ledger.store.list().unwrap();

    let assigned: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = ["c1", "c2"]
            .into_iter()
            .map(|slave| {
                let ledger = fleet.ledger.clone();
                let snapshot = snapshot.clone();
                scope.spawn(move || {
                    assign_queued(&ledger, &snapshot, &[SlaveId::new(slave)], &HashSet::new()).unwrap().len()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(assigned, 1);
    let task = fleet.task("t1");
    assert_eq!(task.status, TaskStatus::Running);
    assert!(task.assigned_slave_id.is_some());
    let assigned_audits = fleet.audit_kinds().into_iter().filter(|k| *k == AuditKind::TaskAssigned).count();
    assert_eq!(assigned_audits, 1);
}

#[test]
fn file_owner_waits_for_directory_owner() {
    let mut holder = busy("t0", TaskStatus::Running, "c1");
    holder.owner_dirs = vec!["a".to_string()];
    let fleet = Fleet::with_tasks(&[holder, queued_files("t1", &["a/b.ts"])]);

    let assigned = assign_queued(
        &fleet.ledger,
        &fleet.ledger.store.list().unwrap(),
        &[SlaveId::new("c2")],
        &HashSet::new(),
    )
    .unwrap();

    assert!(assigned.is_empty());
    assert_eq!(fleet.task("t1").status, TaskStatus::Queued);
}

#[test]
fn sibling_files_run_side_by_side() {
    let mut holder = busy("t0", TaskStatus::Running, "c1");
    holder.owner_files = vec!["a/b.ts".to_string()];
    let fleet = Fleet::with_tasks(&[holder, queued_files("t1", &["a/c.ts"])]);

    let assigned = assign_queued(
        &fleet.ledger,
        &fleet.ledger.store.list().unwrap(),
        &[SlaveId::new("c2")],
        &HashSet::new(),
    )
    .unwrap();

    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].assigned_slave_id, Some(SlaveId::new("c2")));
}

#[test]
fn stale_worker_releases_its_locks() {
    let mut holder = busy("t0", TaskStatus::Running, "c1");
    holder.owner_dirs = vec!["src".to_string()];
    let fleet = Fleet::with_tasks(&[holder, queued_dirs("t1", &["src/api"])]);
    let stale = HashSet::from([SlaveId::new("c1")]);

    let assigned =
        assign_queued(&fleet.ledger, &fleet.ledger.store.list().unwrap(), &[SlaveId::new("c2")], &stale).unwrap();

    assert_eq!(assigned.len(), 1);
    assert_eq!(fleet.task("t1").assigned_slave_id, Some(SlaveId::new("c2")));
}

#[test]
fn worker_is_prompted_once() {
    let fleet = Fleet::with_tasks(&[queued_dirs("t1", &["src"])]);
    assign_queued(&fleet.ledger, &fleet.ledger.store.list().unwrap(), &[SlaveId::new("c1")], &HashSet::new())
        .unwrap();
    let id = TaskId::new("t1");
    let slave = SlaveId::new("c1");

    let ticket = PromptGate::begin(&fleet.ledger, &id, &slave).unwrap().unwrap();
    assert!(matches!(PromptGate::begin(&fleet.ledger, &id, &slave).unwrap(), Err(Skip::Claimed)));

    ticket.mark_prompted().unwrap().unwrap();
    assert!(matches!(PromptGate::begin(&fleet.ledger, &id, &slave).unwrap(), Err(Skip::AlreadyPrompted)));
    assert!(fleet.task("t1").prompted_at.is_some());
}
