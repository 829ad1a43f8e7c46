// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable, file-backed storage for fleet.
//!
//! Every structure here is shared between processes through the filesystem:
//! task records are replaced atomically, journals are append-only, and the
//! claim lock files are the only cross-process mutual exclusion primitive.

mod atomic;
mod claim;
mod journal;
mod spool;
mod task_store;

pub use claim::{normalize_key, Acquire, Claim, ClaimError, ClaimManager, LockRecord};
pub use journal::{AuditLog, JournalError, JournalTail, NoteEntry, NoteHistory};
pub use spool::{DrainReport, Replay, Spool, SpoolEntry, SpoolError};
pub use task_store::{StoreError, TaskStore};
