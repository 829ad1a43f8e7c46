// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-core: domain types for the fleet task coordinator

pub mod macros;

pub mod audit;
pub mod clock;
pub mod id;
pub mod task;
pub mod validate;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use audit::{AuditEvent, AuditKind};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{SlaveId, TaskId};
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
pub use task::{Task, TaskStatus, UnknownStatus, Usage};
pub use validate::{validate_record, validate_task, ValidationReport};
