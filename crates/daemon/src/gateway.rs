// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The write path every collaborator uses.
//!
//! An operation goes to the daemon over IPC when it can. When the transport
//! fails, the first failure of a streak falls back to a direct write against
//! the ledger. Once failures have persisted past the grace window, operations
//! are spooled instead and replayed by [`Gateway::drain_spool`] after the
//! daemon comes back.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_core::{Clock, SystemClock};
use fleet_engine::{Applier, CommitGate, EngineError};
use fleet_storage::{DrainReport, Replay, Spool, SpoolEntry, SpoolError};
use fleet_wire::{Operation, ProtocolError};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{IpcClient, IpcError};
use crate::lifecycle::Config;

/// Which path handled an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchRoute {
    Transport,
    Spool,
    Direct,
}

fleet_core::simple_display! {
    DispatchRoute {
        Transport => "transport",
        Spool => "spool",
        Direct => "direct",
    }
}

/// Outcome of [`Gateway::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub route: DispatchRoute,
    /// Response data; `None` when spooled.
    pub data: Option<Value>,
}

/// Errors from the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The daemon received the operation and refused it.
    #[error("rejected by daemon: {0}")]
    Rejected(String),

    /// Transport failed and so did the direct write.
    #[error("direct write failed after transport error ({transport}): {source}")]
    Direct {
        transport: IpcError,
        #[source]
        source: EngineError,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Spool error: {0}")]
    Spool(#[from] SpoolError),
}

/// Dispatch façade over transport, spool and direct writes.
///
/// Clones share the failure-streak state.
#[derive(Clone)]
pub struct Gateway<C: Clock = SystemClock> {
    client: IpcClient<C>,
    spool: Spool<C>,
    applier: Applier<C>,
    grace: Duration,
    drain_max: usize,
    /// First failure of the current streak, per socket path.
    streaks: Arc<Mutex<HashMap<PathBuf, Instant>>>,
    clock: C,
}

impl<C: Clock> Gateway<C> {
    pub fn new(client: IpcClient<C>, spool: Spool<C>, applier: Applier<C>, config: &Config) -> Self {
        let clock = applier.ledger().clock.clone();
        Self {
            client,
            spool,
            applier,
            grace: config.spool_grace,
            drain_max: config.spool_drain_max,
            streaks: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Open a gateway over `config`'s state root.
    pub fn open(config: &Config, clock: C, commits: Arc<dyn CommitGate>) -> Result<Self, EngineError> {
        let ledger = config.ledger(clock.clone())?;
        let spool = config.spool(&ledger);
        Ok(Self::new(config.client(clock), spool, Applier::new(ledger, commits), config))
    }

    pub fn client(&self) -> &IpcClient<C> {
        &self.client
    }

    pub fn spool(&self) -> &Spool<C> {
        &self.spool
    }

    /// Deliver `op` by the first path that works.
    pub async fn dispatch(&self, op: &Operation) -> Result<Dispatched, GatewayError> {
        let payload = op.payload()?;
        let transport = match self.client.request(op.kind(), payload.clone()).await {
            Ok(response) if response.ok => {
                self.clear_streak();
                debug!(kind = op.kind(), route = %DispatchRoute::Transport, "dispatched");
                self.drain_opportunistically().await;
                return Ok(Dispatched { route: DispatchRoute::Transport, data: response.data });
            }
            Ok(response) => {
                return Err(GatewayError::Rejected(response.error.unwrap_or_default()));
            }
            Err(e) => e,
        };

        if self.streak_past_grace() {
            match self.spool.append(op.kind(), payload) {
                Ok(()) => {
                    warn!(kind = op.kind(), error = %transport, route = %DispatchRoute::Spool, "transport down, spooled");
                    return Ok(Dispatched { route: DispatchRoute::Spool, data: None });
                }
                Err(e) => warn!(kind = op.kind(), error = %e, "spool append failed, writing directly"),
            }
        }

        match self.applier.apply(op) {
            Ok(data) => {
                info!(kind = op.kind(), error = %transport, route = %DispatchRoute::Direct, "transport unavailable, wrote directly");
                Ok(Dispatched { route: DispatchRoute::Direct, data: Some(data) })
            }
            Err(source) => Err(GatewayError::Direct { transport, source }),
        }
    }

    /// Replay spooled operations through the transport.
    ///
    /// Unknown types and payloads that fail validation are dropped; entries
    /// the daemon could not take are kept for the next pass.
    pub async fn drain_spool(&self) -> Result<DrainReport, GatewayError> {
        let client = self.client.clone();
        let report = self
            .spool
            .drain(self.drain_max, move |entry: SpoolEntry| {
                let client = client.clone();
                async move {
                    if let Err(e) = Operation::from_parts(&entry.kind, entry.payload.clone()) {
                        warn!(kind = %entry.kind, error = %e, "dropping spooled operation");
                        return Replay::Unknown;
                    }
                    match client.request(&entry.kind, entry.payload).await {
                        Ok(response) if response.ok => Replay::Done,
                        Ok(response) => {
                            warn!(kind = %entry.kind, error = ?response.error, "spooled operation rejected, keeping");
                            Replay::Retry
                        }
                        Err(e) => {
                            debug!(kind = %entry.kind, error = %e, "transport unavailable during drain");
                            Replay::Retry
                        }
                    }
                }
            })
            .await?;
        Ok(report)
    }

    async fn drain_opportunistically(&self) {
        match self.spool.is_empty() {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self.drain_spool().await {
                    warn!(error = %e, "spool drain failed");
                }
            }
            Err(e) => warn!(error = %e, "failed to read spool"),
        }
    }

    fn clear_streak(&self) {
        self.streaks.lock().remove(self.client.socket_path());
    }

    /// Record a transport failure; true once the streak has outlived the
    /// grace window. The first failure of a streak is never past it.
    fn streak_past_grace(&self) -> bool {
        let now = self.clock.now();
        let mut streaks = self.streaks.lock();
        match streaks.get(self.client.socket_path()) {
            Some(started) => now.saturating_duration_since(*started) >= self.grace,
            None => {
                streaks.insert(self.client.socket_path().to_path_buf(), now);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
