// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and worker identifiers.

crate::string_id! {
    /// Unique, immutable identifier of a task record.
    ///
    /// Task ids double as file stems in the task store and as claim keys.
    pub struct TaskId;
}

crate::string_id! {
    /// Identifier of a worker ("slave") process.
    pub struct SlaveId;
}

const FOLLOWUP_ALPHABET: [char; 32] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j',
    'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'v', 'w', 'x', 'y', 'z',
];

impl TaskId {
    /// Id for a follow-up spawned when `original` is blocked.
    ///
    /// Format: `{original}-fu-{6 random chars}`.
    pub fn followup(original: &TaskId) -> Self {
        Self(format!("{}-fu-{}", original, nanoid::nanoid!(6, &FOLLOWUP_ALPHABET)))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
