// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};
use serde_json::json;

#[yare::parameterized(
    rework      = { TaskStatus::Rework,     "TASK_REWORK" },
    blocked     = { TaskStatus::Blocked,    "TASK_BLOCKED" },
    failed      = { TaskStatus::Failed,     "TASK_FAILED" },
    needs_judge = { TaskStatus::NeedsJudge, "TASK_NEEDS_JUDGE" },
    done        = { TaskStatus::Done,       "TASK_DONE" },
    running     = { TaskStatus::Running,    "TASK_STATUS" },
    paused      = { TaskStatus::Paused,     "TASK_STATUS" },
    queued      = { TaskStatus::Queued,     "TASK_STATUS" },
)]
fn kind_for_status(status: TaskStatus, expected: &str) {
    let kind = AuditKind::for_status(status);
    assert_eq!(kind.to_string(), expected);
    assert_eq!(serde_json::to_value(kind).unwrap(), json!(expected));
}

#[test]
fn event_line_shape() {
    let clock = FakeClock::new();
    let event = AuditEvent::new(clock.utc(), AuditKind::TaskDone, "t1 -> done")
        .task(&TaskId::new("t1"))
        .slave(Some(&SlaveId::new("c2")));
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "TASK_DONE");
    assert_eq!(value["taskId"], "t1");
    assert_eq!(value["slaveId"], "c2");
    assert!(value.get("data").is_none());
}

#[test]
fn usage_fields_merge_into_data() {
    let usage = Usage { tokens: 1200.0, cost: 0.4, judge_tokens: None, judge_cost: None };
    let event = AuditEvent::new(FakeClock::new().utc(), AuditKind::TaskStatus, "m")
        .data(json!({"from": "running"}))
        .usage(Some(&usage));
    assert_eq!(
        event.data,
        Some(json!({"from": "running", "tokens": 1200.0, "cost": 0.4}))
    );
}

#[test]
fn no_usage_leaves_data_untouched() {
    let event = AuditEvent::new(FakeClock::new().utc(), AuditKind::TaskStatus, "m").usage(None);
    assert!(event.data.is_none());
}
