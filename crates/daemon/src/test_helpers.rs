// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon tests.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::{FakeClock, Task, TaskId};
use fleet_engine::{Applier, Ledger, NoCommitGate};
use fleet_storage::Spool;
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

use crate::{Config, Gateway, HandlerRegistry, IpcClient, Server};

pub(crate) struct TestDaemon {
    pub config: Config,
    pub clock: FakeClock,
    pub applier: Applier<FakeClock>,
    pub shutdown: CancellationToken,
    _dir: TempDir,
}

impl TestDaemon {
    /// State root with no server running.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::at(dir.path());
        config.ipc_timeout = Duration::from_millis(500);
        let clock = FakeClock::new();
        let ledger = config.ledger(clock.clone()).unwrap();
        Self {
            applier: Applier::new(ledger, Arc::new(NoCommitGate)),
            config,
            clock,
            shutdown: CancellationToken::new(),
            _dir: dir,
        }
    }

    /// Bind the socket and serve every operation type.
    pub fn serve(&self) {
        self.serve_with(HandlerRegistry::for_applier(self.applier.clone()));
    }

    pub fn serve_with(&self, handlers: HandlerRegistry) {
        let listener = UnixListener::bind(&self.config.socket_path).unwrap();
        let server = Server::new(listener, handlers, self.shutdown.clone());
        tokio::spawn(server.run());
    }

    /// Stop serving and remove the socket, as `fleetd` does on exit.
    pub fn stop(&self) {
        self.shutdown.cancel();
        let _ = std::fs::remove_file(&self.config.socket_path);
    }

    pub fn ledger(&self) -> &Ledger<FakeClock> {
        self.applier.ledger()
    }

    pub fn client(&self) -> IpcClient<FakeClock> {
        self.config.client(self.clock.clone())
    }

    pub fn spool(&self) -> Spool<FakeClock> {
        self.config.spool(self.ledger())
    }

    pub fn gateway(&self) -> Gateway<FakeClock> {
        Gateway::new(self.client(), self.spool(), self.applier.clone(), &self.config)
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.ledger().store.load(&TaskId::new(id)).unwrap()
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
