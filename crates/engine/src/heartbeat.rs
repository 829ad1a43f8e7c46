// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_core::SlaveId;

/// Workers whose last heartbeat is older than `threshold`.
///
/// A worker that never reported is not stale: absence of a heartbeat says
/// nothing about whether it is still working.
pub fn stale_slaves(
    heartbeats: &HashMap<SlaveId, DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> HashSet<SlaveId> {
    heartbeats
        .iter()
        .filter(|(_, last)| {
            // Clock skew can put a heartbeat in the future; that is fresh.
            (now - **last).to_std().is_ok_and(|age| age > threshold)
        })
        .map(|(slave, _)| slave.clone())
        .collect()
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
