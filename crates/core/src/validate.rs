// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record validation.
//!
//! Runs over the raw JSON form so the same rules apply to records read from
//! disk, records received over IPC, and records about to be saved. Errors
//! block persistence; warnings are informational.

use crate::task::{Task, TaskStatus};
use serde_json::{Map, Value};

/// Outcome of validating one task record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a typed task.
pub fn validate_task(task: &Task) -> ValidationReport {
    match serde_json::to_value(task) {
        Ok(value) => validate_record(&value),
        Err(e) => ValidationReport { errors: vec![format!("record: {}", e)], warnings: vec![] },
    }
}

/// Validate a raw task record.
pub fn validate_record(value: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let Some(obj) = value.as_object() else {
        report.errors.push("record: expected object".to_string());
        return report;
    };

    if !non_empty_str(obj.get("id")) {
        report.errors.push("id: missing".to_string());
    }
    if !non_empty_str(obj.get("prompt")) {
        report.errors.push("prompt: missing".to_string());
    }
    match obj.get("status") {
        None | Some(Value::Null) => report.errors.push("status: missing".to_string()),
        Some(Value::String(s)) if s.parse::<TaskStatus>().is_ok() => {}
        Some(other) => report.errors.push(format!("status: invalid value {}", other)),
    }

    check_string_list(obj, "ownerDirs", &mut report);
    check_string_list(obj, "ownerFiles", &mut report);

    if let Some(resume) = obj.get("resumeSlaveId") {
        if !resume.is_null() && !non_empty_str(Some(resume)) {
            report.errors.push("resumeSlaveId: empty".to_string());
        }
    }

    if let Some(usage) = obj.get("usage").filter(|u| !u.is_null()) {
        check_usage(usage, &mut report);
    }

    if list_len(obj, "ownerDirs") == 0 && list_len(obj, "ownerFiles") == 0 {
        report.warnings.push("no ownerDirs or ownerFiles declared".to_string());
    }
    if !non_empty_str(obj.get("baseMainSha")) {
        report.warnings.push("baseMainSha: missing".to_string());
    }

    report
}

fn non_empty_str(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.trim().is_empty())
}

fn list_len(obj: &Map<String, Value>, field: &str) -> usize {
    obj.get(field).and_then(Value::as_array).map_or(0, Vec::len)
}

fn check_string_list(obj: &Map<String, Value>, field: &str, report: &mut ValidationReport) {
    match obj.get(field) {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                if !non_empty_str(Some(item)) {
                    report.errors.push(format!("{}[{}]: expected non-empty string", field, i));
                }
            }
        }
        Some(_) => report.errors.push(format!("{}: expected array of strings", field)),
    }
}

fn check_usage(usage: &Value, report: &mut ValidationReport) {
    let Some(obj) = usage.as_object() else {
        report.errors.push("usage: expected object".to_string());
        return;
    };
    for field in ["tokens", "cost"] {
        match obj.get(field) {
            Some(Value::Number(_)) => {}
            None | Some(Value::Null) => report.errors.push(format!("usage.{}: missing", field)),
            Some(_) => report.errors.push(format!("usage.{}: expected number", field)),
        }
    }
    for field in ["judgeTokens", "judgeCost"] {
        match obj.get(field) {
            None | Some(Value::Null) | Some(Value::Number(_)) => {}
            Some(_) => report.errors.push(format!("usage.{}: expected number", field)),
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
