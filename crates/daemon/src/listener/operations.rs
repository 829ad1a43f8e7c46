// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use fleet_core::Clock;
use fleet_engine::Applier;
use fleet_wire::{Operation, RequestEnvelope};
use serde_json::Value;

use super::Handler;

/// Validates the payload for its `type` and applies it to the ledger.
pub struct ApplyHandler<C: Clock> {
    applier: Applier<C>,
}

impl<C: Clock> ApplyHandler<C> {
    pub fn new(applier: Applier<C>) -> Self {
        Self { applier }
    }
}

#[async_trait]
impl<C: Clock> Handler for ApplyHandler<C> {
    async fn handle(&self, request: RequestEnvelope) -> Result<Option<Value>, String> {
        let op = Operation::try_from(&request).map_err(|e| e.to_string())?;
        // Applying touches claims and fsyncs; keep it off the runtime workers.
        let applier = self.applier.clone();
        match tokio::task::spawn_blocking(move || applier.apply(&op)).await {
            Ok(result) => result.map(Some).map_err(|e| e.to_string()),
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(join) => Err(join.to_string()),
        }
    }
}
