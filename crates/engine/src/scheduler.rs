// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capacity: how many workers may be active this tick.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conflict rate above which capacity is throttled.
pub const THROTTLE_CONFLICT_RATE: f64 = 0.10;
/// Conflict rate below which exploration may use every worker.
pub const EXPLORE_CONFLICT_RATE: f64 = 0.02;
pub const EXPLORE_MIN_READY: usize = 4;
pub const THROTTLED_CAP: usize = 2;

/// Scheduling phase hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Explore,
    #[default]
    Execute,
    Integrate,
}

fleet_core::simple_display! {
    Phase {
        Explore => "explore",
        Execute => "execute",
        Integrate => "integrate",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase: {0}")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explore" => Ok(Phase::Explore),
            "execute" => Ok(Phase::Execute),
            "integrate" => Ok(Phase::Integrate),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapInputs {
    pub slave_cap: usize,
    pub ready_count: usize,
    pub phase: Phase,
    pub conflict_rate: f64,
    pub integration_backlog: usize,
    pub token_burn_per_min: f64,
    pub burn_cap: f64,
}

/// Apply the capacity rules in order; each may override the previous one,
/// except the burn penalty which is always last.
pub fn compute_cap(inputs: &CapInputs) -> usize {
    let mut cap = inputs.slave_cap.min(inputs.ready_count);

    if inputs.phase == Phase::Integrate
        || inputs.conflict_rate > THROTTLE_CONFLICT_RATE
        || inputs.integration_backlog > 0
    {
        cap = cap.min(THROTTLED_CAP);
    }

    if inputs.phase == Phase::Explore
        && inputs.conflict_rate < EXPLORE_CONFLICT_RATE
        && inputs.ready_count >= EXPLORE_MIN_READY
    {
        cap = cap.max(inputs.slave_cap);
    }

    if inputs.token_burn_per_min > inputs.burn_cap {
        cap = cap.saturating_sub(1);
    }
    cap
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
