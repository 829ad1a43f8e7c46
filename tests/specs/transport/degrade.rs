//! Gateway degrade specs
//!
//! Verify that a short outage is absorbed by direct writes, a sustained one
//! by the spool, and that spooled operations reach the daemon once it is
//! back.

use std::sync::Arc;

use fleet_daemon::startup;
use fleet_storage::DrainReport;

use crate::prelude::*;

#[tokio::test]
async fn outage_degrades_then_recovers() {
    let fleet = Fleet::new();
    let gateway = fleet.gateway();

    // Daemon down: the first failure writes directly.
    let first = gateway.dispatch(&create(queued_dirs("t1", &["src"]))).await.unwrap();
    assert_eq!(first.route, DispatchRoute::Direct);
    assert!(!fleet.config.spool_path.exists());

    // Still down past the grace window: operations are spooled.
    fleet.clock.advance(fleet.config.spool_grace);
    let second = gateway.dispatch(&set_status("t1", TaskStatus::Failed, None)).await.unwrap();
    assert_eq!(second.route, DispatchRoute::Spool);
    assert_eq!(fleet.task("t1").status, TaskStatus::Queued);

    // Daemon starts; the spool replays through it.
    let mut daemon = startup(&fleet.config, Arc::new(NoCommitGate)).await.unwrap();
    let shutdown = tokio_util::sync::CancellationToken::new();
    let handlers = HandlerRegistry::for_applier(daemon.daemon.applier.clone());
    tokio::spawn(Server::new(daemon.listener, handlers, shutdown.clone()).run());
    fleet.clock.advance(fleet.config.down_cache);

    let report = gateway.drain_spool().await.unwrap();

    assert_eq!(report, DrainReport { replayed: 1, ..DrainReport::default() });
    assert_eq!(fleet.task("t1").status, TaskStatus::Failed);
    assert!(!fleet.config.spool_path.exists());

    let third = gateway.dispatch(&Operation::Ping).await.unwrap();
    assert_eq!(third.route, DispatchRoute::Transport);

    shutdown.cancel();
    daemon.daemon.shutdown().unwrap();
    assert!(!fleet.config.socket_path.exists());
}

#[tokio::test]
async fn spool_respects_byte_cap() {
    let mut fleet = Fleet::new();
    fleet.config.spool_max_bytes = 2048;
    let gateway = fleet.gateway();
    gateway.dispatch(&Operation::Ping).await.unwrap();
    fleet.clock.advance(fleet.config.spool_grace);

    for i in 0..40 {
        let note = Operation::AddNote(TaskNote {
            task_id: TaskId::new("t1"),
            slave_id: None,
            note: format!("note {i}"),
        });
        assert_eq!(gateway.dispatch(&note).await.unwrap().route, DispatchRoute::Spool);
    }

    let size = std::fs::metadata(&fleet.config.spool_path).unwrap().len();
    assert!(size <= 2048, "spool is {size} bytes");
    let entries = gateway.spool().entries().unwrap();
    assert!(entries.len() < 40);
    assert_eq!(entries.last().unwrap().payload["note"], json!("note 39"));
}
