// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Coordination engine for fleet.
//!
//! Pure decisions (lock snapshots, capacity, staleness) live beside the code
//! that acts on them against a [`Ledger`]. Every status change goes through
//! [`transition`]; every externally requested change goes through
//! [`Applier`].

mod apply;
mod assign;
mod error;
mod gate;
mod heartbeat;
mod ledger;
mod lock_state;
mod scheduler;
mod tick;
mod transition;

#[cfg(test)]
mod test_helpers;

pub use apply::{Applier, CommitGate, NoCommitGate};
pub use assign::assign_queued;
pub use error::EngineError;
pub use gate::{JudgeGate, PromptGate, PromptTicket, Skip};
pub use heartbeat::stale_slaves;
pub use ledger::Ledger;
pub use lock_state::{build_lock_state, count_conflicts, has_conflict, normalize_path, top_dir, LockState};
pub use scheduler::{compute_cap, CapInputs, Phase, UnknownPhase};
pub use tick::{plan_tick, run_tick, SlaveRoster, TickInputs, TickOutcome, TickPlan};
pub use transition::{transition, Transition};
