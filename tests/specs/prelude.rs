//! Shared fixtures for specs.

use std::sync::Arc;
use std::time::Duration;

pub use fleet_core::test_support::{busy, queued_dirs, queued_files};
pub use fleet_core::{AuditKind, FakeClock, SlaveId, Task, TaskId, TaskStatus};
pub use fleet_daemon::{Config, DispatchRoute, Gateway, HandlerRegistry, IpcClient, Server};
pub use fleet_engine::{Applier, Ledger, NoCommitGate};
pub use fleet_wire::{CreateTask, Handoff, Operation, TaskNote, TaskStatusUpdate};
pub use serde_json::json;

use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

/// A temporary state root with a fake clock.
pub struct Fleet {
    pub config: Config,
    pub clock: FakeClock,
    pub ledger: Ledger<FakeClock>,
    shutdown: CancellationToken,
    _dir: TempDir,
}

impl Fleet {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::at(dir.path());
        config.ipc_timeout = Duration::from_millis(500);
        let clock = FakeClock::new();
        let ledger = config.ledger(clock.clone()).unwrap();
        Self { config, clock, ledger, shutdown: CancellationToken::new(), _dir: dir }
    }

    pub fn with_tasks(tasks: &[Task]) -> Self {
        let fleet = Self::new();
        for task in tasks {
            fleet.ledger.store.save(task).unwrap();
        }
        fleet
    }

    pub fn applier(&self) -> Applier<FakeClock> {
        Applier::new(self.ledger.clone(), Arc::new(NoCommitGate))
    }

    /// Start serving on the configured socket.
    pub fn start_daemon(&self) {
        let listener = UnixListener::bind(&self.config.socket_path).unwrap();
        let handlers = HandlerRegistry::for_applier(self.applier());
        tokio::spawn(Server::new(listener, handlers, self.shutdown.clone()).run());
    }

    pub fn client(&self) -> IpcClient<FakeClock> {
        self.config.client(self.clock.clone())
    }

    pub fn gateway(&self) -> Gateway<FakeClock> {
        Gateway::new(self.client(), self.config.spool(&self.ledger), self.applier(), &self.config)
    }

    pub fn task(&self, id: &str) -> Task {
        self.ledger.store.load(&TaskId::new(id)).unwrap().unwrap()
    }

    pub fn try_task(&self, id: &str) -> Option<Task> {
        self.ledger.store.load(&TaskId::new(id)).unwrap()
    }

    pub fn audit_kinds(&self) -> Vec<AuditKind> {
        self.ledger.audit.read_from(0).unwrap().entries.into_iter().map(|e| e.kind).collect()
    }
}

impl Drop for Fleet {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub fn create(task: Task) -> Operation {
    Operation::CreateTask(CreateTask { task })
}

pub fn set_status(id: &str, status: TaskStatus, slave: Option<&str>) -> Operation {
    Operation::SetStatus(TaskStatusUpdate {
        task_id: TaskId::new(id),
        status,
        slave_id: slave.map(SlaveId::new),
        usage: None,
    })
}
