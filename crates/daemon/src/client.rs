// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the IPC socket.
//!
//! Before connecting, the client checks whether the socket was recently found
//! unreachable and whether the socket file exists; either short-circuits the
//! request. A missing socket, a failed connect, or a timeout marks the
//! endpoint down for the configured window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_core::{Clock, SystemClock};
use fleet_wire::{decode_response, write_line, Operation, ProtocolError, RequestEnvelope, ResponseEnvelope};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;
use uuid::Uuid;

/// Transport failures. None of these say anything about the operation itself.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("ipc socket {0} recently unreachable")]
    Down(PathBuf),

    #[error("ipc socket {0} does not exist")]
    Missing(PathBuf),

    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ipc request {id} timed out after {timeout:?}")]
    Timeout { id: String, timeout: Duration },

    #[error("connection closed before a response to {0}")]
    Closed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Request/response client for one socket path.
///
/// Clones share the down-cache.
#[derive(Clone)]
pub struct IpcClient<C: Clock = SystemClock> {
    socket_path: PathBuf,
    timeout: Duration,
    down_for: Duration,
    down_until: Arc<Mutex<Option<Instant>>>,
    clock: C,
}

impl<C: Clock> IpcClient<C> {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration, down_for: Duration, clock: C) -> Self {
        Self { socket_path: socket_path.into(), timeout, down_for, down_until: Arc::new(Mutex::new(None)), clock }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_marked_down(&self) -> bool {
        self.down_until.lock().is_some_and(|until| self.clock.now() < until)
    }

    fn mark_down(&self) {
        *self.down_until.lock() = Some(self.clock.now() + self.down_for);
    }

    /// Send `op` and wait for its response.
    pub async fn send(&self, op: &Operation) -> Result<ResponseEnvelope, IpcError> {
        self.request(op.kind(), op.payload()?).await
    }

    /// Send one request line and wait for the response with the same id.
    ///
    /// A response with `ok:false` is returned as `Ok`; only transport
    /// failures are errors.
    pub async fn request(&self, kind: &str, payload: Value) -> Result<ResponseEnvelope, IpcError> {
        if self.is_marked_down() {
            return Err(IpcError::Down(self.socket_path.clone()));
        }
        if tokio::fs::metadata(&self.socket_path).await.is_err() {
            self.mark_down();
            return Err(IpcError::Missing(self.socket_path.clone()));
        }

        let request = RequestEnvelope::new(Uuid::new_v4().to_string(), kind, payload);
        // On timeout the exchange future is dropped, which closes the socket.
        match tokio::time::timeout(self.timeout, self.exchange(&request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                if matches!(e, IpcError::Connect { .. }) {
                    self.mark_down();
                }
                Err(e)
            }
            Err(_) => {
                self.mark_down();
                Err(IpcError::Timeout { id: request.id, timeout: self.timeout })
            }
        }
    }

    async fn exchange(&self, request: &RequestEnvelope) -> Result<ResponseEnvelope, IpcError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| IpcError::Connect { path: self.socket_path.clone(), source })?;
        let (reader, mut writer) = stream.into_split();
        write_line(&mut writer, request).await?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            match decode_response(&line) {
                Ok(response) if response.id == request.id => return Ok(response),
                Ok(response) => debug!(expected = %request.id, got = %response.id, "ignoring unmatched response"),
                Err(e) => debug!(error = %e, "ignoring unparsable response line"),
            }
        }
        Err(IpcError::Closed(request.id.clone()))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
