// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::time::Duration;

use fleet_core::{AuditEvent, Clock, SystemClock};
use fleet_storage::{AuditLog, ClaimManager, NoteHistory, TaskStore};
use tracing::warn;

use crate::EngineError;

/// The durable state one state root exposes to the engine.
///
/// Layout under the root: `tasks/`, `locks/`, `history/`, `audit.jsonl`.
#[derive(Clone)]
pub struct Ledger<C: Clock = SystemClock> {
    pub store: TaskStore,
    pub audit: AuditLog,
    pub history: NoteHistory,
    pub claims: ClaimManager<C>,
    pub clock: C,
    pub claim_ttl: Duration,
}

impl<C: Clock> Ledger<C> {
    pub fn open(root: &Path, clock: C, claim_ttl: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            store: TaskStore::open(root.join("tasks"))?,
            audit: AuditLog::new(root.join("audit.jsonl")),
            history: NoteHistory::new(root.join("history")),
            claims: ClaimManager::new(root.join("locks"), clock.clone())?,
            clock,
            claim_ttl,
        })
    }

    pub(crate) fn record(&self, event: AuditEvent) -> Result<(), EngineError> {
        self.audit.append(&event).map_err(|e| {
            warn!(kind = %event.kind, error = %e, "failed to append audit event");
            EngineError::from(e)
        })
    }
}
