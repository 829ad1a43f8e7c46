// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// Only envelope version this crate speaks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Request line from a client to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub v: u32,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl RequestEnvelope {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        Self { v: PROTOCOL_VERSION, id: id.into(), kind: kind.into(), payload }
    }

    pub fn check_version(&self) -> Result<(), ProtocolError> {
        if self.v == PROTOCOL_VERSION {
            Ok(())
        } else {
            Err(ProtocolError::UnsupportedVersion(self.v))
        }
    }
}

/// Response line from the daemon, matched to its request by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(id: impl Into<String>, data: Option<Value>) -> Self {
        Self { v: PROTOCOL_VERSION, id: id.into(), ok: true, data, error: None }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self { v: PROTOCOL_VERSION, id: id.into(), ok: false, data: None, error: Some(error.into()) }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
