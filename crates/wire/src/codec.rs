// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{RequestEnvelope, ResponseEnvelope};

/// Errors that can occur in protocol handling
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported ipc version: {0}")]
    UnsupportedVersion(u32),

    #[error("unknown ipc type: {0}")]
    UnknownType(String),

    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialize a message as one newline-terminated JSON line.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut line = serde_json::to_vec(msg)?;
    line.push(b'\n');
    Ok(line)
}

pub fn decode_request(line: &str) -> Result<RequestEnvelope, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}

pub fn decode_response(line: &str) -> Result<ResponseEnvelope, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Best-effort `id` from a line that failed to decode as an envelope.
pub fn request_id_hint(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line.trim()).ok()?;
    match value.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Write one encoded line and flush.
pub async fn write_line<W, T>(writer: &mut W, msg: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = encode_line(msg)?;
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
