// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use std::time::Duration;

use fleet_core::{AuditKind, FakeClock, Task, TaskId};
use tempfile::TempDir;

use crate::Ledger;

pub(crate) const CLAIM_TTL: Duration = Duration::from_secs(60);

pub(crate) struct TestLedger {
    pub ledger: Ledger<FakeClock>,
    pub clock: FakeClock,
    _dir: TempDir,
}

impl std::ops::Deref for TestLedger {
    type Target = Ledger<FakeClock>;

    fn deref(&self) -> &Self::Target {
        &self.ledger
    }
}

impl TestLedger {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = FakeClock::new();
        let ledger = Ledger::open(dir.path(), clock.clone(), CLAIM_TTL).unwrap();
        Self { ledger, clock, _dir: dir }
    }

    pub fn with_tasks(tasks: &[Task]) -> Self {
        let this = Self::new();
        for task in tasks {
            this.store.save(task).unwrap();
        }
        this
    }

    pub fn task(&self, id: &str) -> Task {
        self.store.load(&TaskId::new(id)).unwrap().unwrap()
    }

    pub fn audit_kinds(&self) -> Vec<AuditKind> {
        self.audit.read_from(0).unwrap().entries.into_iter().map(|e| e.kind).collect()
    }
}
