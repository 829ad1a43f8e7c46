// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server for the JSON-line IPC protocol.
//!
//! Each accepted connection runs in its own task. Lines are read and answered
//! one at a time; a line that fails to parse gets an error response and the
//! connection stays open. Handlers run in a spawned task so a panic becomes
//! an `ok:false` response instead of taking the connection down.

mod operations;

pub use operations::ApplyHandler;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_core::Clock;
use fleet_engine::Applier;
use fleet_wire::{
    decode_request, request_id_hint, write_line, Operation, ProtocolError, RequestEnvelope, ResponseEnvelope,
};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Async handler for one request `type`.
///
/// `Ok(data)` becomes `ok:true` with optional `data`; `Err(message)` becomes
/// `ok:false` with `error: message`.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, request: RequestEnvelope) -> Result<Option<Value>, String>;
}

/// Handlers keyed by request `type`.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation type, applied through `applier`.
    pub fn for_applier<C: Clock>(applier: Applier<C>) -> Self {
        let handler: Arc<dyn Handler> = Arc::new(ApplyHandler::new(applier));
        let mut registry = Self::new();
        for kind in Operation::KINDS {
            registry.handlers.insert(kind.to_string(), Arc::clone(&handler));
        }
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.handlers.insert(kind.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Accept loop over a bound Unix socket.
pub struct Server {
    listener: UnixListener,
    handlers: Arc<HandlerRegistry>,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(listener: UnixListener, handlers: HandlerRegistry, shutdown: CancellationToken) -> Self {
        Self { listener, handlers: Arc::new(handlers), shutdown }
    }

    /// Run until `shutdown` is cancelled, spawning a task per connection.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("listener stopping");
                    break;
                }
                result = self.listener.accept() => match result {
                    Ok((stream, _)) => {
                        let handlers = Arc::clone(&self.handlers);
                        let shutdown = self.shutdown.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &handlers, &shutdown).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Io(ref io) if io.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("Client disconnected")
        }
        _ => warn!("Connection error: {}", e),
    }
}

/// Answer each request line on one connection until EOF or shutdown.
pub(crate) async fn handle_connection<R, W>(
    reader: R,
    mut writer: W,
    handlers: &HandlerRegistry,
    shutdown: &CancellationToken,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            return Ok(());
        }
        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                respond(line.trim_end_matches(['\n', '\r']), handlers).await
            }
            Err(e) => {
                debug!(error = %e, "request line is not utf-8");
                let hint = request_id_hint(&String::from_utf8_lossy(&buf));
                ResponseEnvelope::failure(hint.unwrap_or_default(), format!("invalid utf-8 in request: {e}"))
            }
        };
        write_line(&mut writer, &response).await?;
    }
}

/// Produce the response for one request line.
pub(crate) async fn respond(line: &str, handlers: &HandlerRegistry) -> ResponseEnvelope {
    let request = match decode_request(line) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "unparsable request line");
            return ResponseEnvelope::failure(request_id_hint(line).unwrap_or_default(), e.to_string());
        }
    };
    if let Err(e) = request.check_version() {
        return ResponseEnvelope::failure(request.id, e.to_string());
    }
    let Some(handler) = handlers.get(&request.kind) else {
        warn!(kind = %request.kind, "no handler for request type");
        return ResponseEnvelope::failure(request.id, ProtocolError::UnknownType(request.kind).to_string());
    };

    let id = request.id.clone();
    let kind = request.kind.clone();
    debug!(%id, %kind, "received request");
    match tokio::spawn(async move { handler.handle(request).await }).await {
        Ok(Ok(data)) => ResponseEnvelope::success(id, data),
        Ok(Err(message)) => {
            info!(%id, %kind, error = %message, "request failed");
            ResponseEnvelope::failure(id, message)
        }
        Err(join) => {
            let message = if join.is_panic() { panic_message(join.into_panic()) } else { join.to_string() };
            error!(%id, %kind, error = %message, "handler panicked");
            ResponseEnvelope::failure(id, message)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
