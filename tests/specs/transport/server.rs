//! IPC server specs
//!
//! Verify that workers can drive task operations over the socket and that
//! bad requests are answered without dropping the connection.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::prelude::*;

#[tokio::test]
async fn worker_reports_progress_over_socket() {
    let fleet = Fleet::new();
    fleet.start_daemon();
    let client = fleet.client();

    let created = client.send(&create(queued_dirs("t1", &["src"]))).await.unwrap();
    assert!(created.ok, "{:?}", created.error);

    let noted = client
        .send(&Operation::AddNote(TaskNote {
            task_id: TaskId::new("t1"),
            slave_id: Some(SlaveId::new("c1")),
            note: "halfway".to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(noted.data, Some(json!({"taskId": "t1"})));

    let blocked = client.send(&set_status("t1", TaskStatus::Blocked, Some("c1"))).await.unwrap();
    assert!(blocked.ok);
    assert_eq!(blocked.data.unwrap()["task"]["status"], json!("blocked"));

    let notes = fleet.ledger.history.read(&TaskId::new("t1")).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].note, "halfway");
    assert_eq!(
        fleet.audit_kinds(),
        vec![AuditKind::TaskCreated, AuditKind::TaskNote, AuditKind::TaskBlocked, AuditKind::TaskCreated]
    );
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let fleet = Fleet::new();
    fleet.start_daemon();
    let client = fleet.client();
    client.send(&create(queued_dirs("t1", &["src"]))).await.unwrap();

    let again = client.send(&create(queued_dirs("t1", &["lib"]))).await.unwrap();

    assert!(!again.ok);
    assert_eq!(fleet.task("t1").owner_dirs, vec!["src".to_string()]);
}

#[tokio::test]
async fn one_connection_survives_bad_lines() {
    let fleet = Fleet::new();
    fleet.start_daemon();

    let stream = UnixStream::connect(&fleet.config.socket_path).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer
        .write_all(
            b"{\"v\":1,\"id\":\"a\",\"type\":\"task.explode\",\"payload\":{}}\n\
              {\"v\":1,\"id\":\"b\",\"type\":\"task.note\",\"payload\":{\"note\":\"x\"}}\n\
              not json\n\
              {\"v\":1,\"id\":\"c\",\"type\":\"ping\",\"payload\":{}}\n",
        )
        .await
        .unwrap();

    let mut lines = BufReader::new(reader).lines();
    let mut responses = Vec::new();
    for _ in 0..4 {
        let line = lines.next_line().await.unwrap().unwrap();
        responses.push(serde_json::from_str::<serde_json::Value>(&line).unwrap());
    }

    assert_eq!(responses[0]["error"], json!("unknown ipc type: task.explode"));
    assert_eq!(responses[1]["ok"], json!(false));
    assert_eq!(responses[1]["id"], json!("b"));
    assert_eq!(responses[2]["ok"], json!(false));
    assert_eq!(responses[3], json!({"v": 1, "id": "c", "ok": true, "data": {"pong": true}}));
}
