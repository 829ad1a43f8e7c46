// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between fleet workers and the coordination daemon.
//!
//! Wire format: one JSON object per line.
//!
//! ```text
//! request:  {"v":1,"id":"...","type":"task.status","payload":{...}}
//! response: {"v":1,"id":"...","ok":true,"data":{...}}
//!           {"v":1,"id":"...","ok":false,"error":"..."}
//! ```

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod envelope;
mod operation;

pub use codec::{decode_request, decode_response, encode_line, request_id_hint, write_line, ProtocolError};
pub use envelope::{RequestEnvelope, ResponseEnvelope, PROTOCOL_VERSION};
pub use operation::{CreateTask, Handoff, Operation, TaskNote, TaskStatusUpdate};
