// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn status_payload_is_camel_case() {
    let op = Operation::from_parts(
        "task.status",
        json!({"taskId": "t1", "status": "needs_judge", "slaveId": "c1", "usage": {"tokens": 12, "cost": 0.5}}),
    )
    .unwrap();

    let Operation::SetStatus(update) = &op else { panic!("expected task.status, got {op:?}") };
    assert_eq!(update.task_id, "t1");
    assert_eq!(update.status, TaskStatus::NeedsJudge);
    assert_eq!(update.slave_id.as_ref().map(SlaveId::as_str), Some("c1"));
    assert_eq!(update.usage.map(|u| u.tokens), Some(12.0));
    assert_eq!(op.task_id().map(TaskId::as_str), Some("t1"));
}

#[test]
fn unknown_type_is_rejected() {
    let err = Operation::from_parts("task.delete", json!({})).unwrap_err();
    assert_eq!(err.to_string(), "unknown ipc type: task.delete");
}

#[yare::parameterized(
    missing_task_id = { "task.note",    json!({"note": "x"}) },
    bad_status      = { "task.status",  json!({"taskId": "t1", "status": "sleeping"}) },
    handoff_no_slave = { "task.handoff", json!({"taskId": "t1"}) },
    create_no_task  = { "task.create",  json!({}) },
    usage_no_cost   = { "task.status",  json!({"taskId": "t1", "status": "done", "usage": {"tokens": 5}}) },
)]
fn invalid_payloads(kind: &str, payload: Value) {
    match Operation::from_parts(kind, payload) {
        Err(ProtocolError::InvalidPayload { kind: k, .. }) => assert_eq!(k, kind),
        other => panic!("expected invalid payload, got {other:?}"),
    }
}

#[test]
fn ping_ignores_payload() {
    assert_eq!(Operation::from_parts("ping", Value::Null).unwrap(), Operation::Ping);
}

#[test]
fn request_from_operation_carries_kind_and_payload() {
    let op = Operation::Handoff(Handoff {
        task_id: TaskId::new("t1"),
        slave_id: SlaveId::new("c2"),
        commit_sha: Some("abc123".to_string()),
        summary: None,
    });
    let request = op.into_request("r9").unwrap();
    assert_eq!(request.kind, "task.handoff");
    assert_eq!(request.payload, json!({"taskId": "t1", "slaveId": "c2", "commitSha": "abc123"}));
    assert_eq!(Operation::try_from(&request).unwrap(), op);
}

#[test]
fn create_accepts_a_full_task_record() {
    let task = Task::builder().id("t7").dirs(&["src"]).build();
    let request = Operation::CreateTask(CreateTask { task: task.clone() }).into_request("r1").unwrap();
    assert_eq!(request.payload["task"]["ownerDirs"], json!(["src"]));
    match Operation::try_from(&request).unwrap() {
        Operation::CreateTask(op) => assert_eq!(op.task, task),
        other => panic!("unexpected {other:?}"),
    }
}
