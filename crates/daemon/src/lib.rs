// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet daemon library
//!
//! The IPC server run by `fleetd`, the client workers use to reach it, and
//! the dispatch gateway that falls back to the spool or to direct writes when
//! the daemon is unreachable.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod listener;

mod client;
mod gateway;

#[cfg(test)]
mod test_helpers;

pub use client::{IpcClient, IpcError};
pub use gateway::{Dispatched, DispatchRoute, Gateway, GatewayError};
pub use lifecycle::{startup, Config, DaemonState, LifecycleError, StartupResult};
pub use listener::{Handler, HandlerRegistry, Server};
