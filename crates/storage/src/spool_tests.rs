// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::FakeClock;
use serde_json::json;
use tempfile::tempdir;

fn spool(dir: &Path, max_bytes: u64) -> Spool<FakeClock> {
    let clock = FakeClock::new();
    let claims = ClaimManager::new(dir.join("locks"), clock.clone()).unwrap();
    Spool::new(dir.join("ipc-spool.jsonl"), max_bytes, claims, clock)
}

fn kinds(spool: &Spool<FakeClock>) -> Vec<String> {
    spool.entries().unwrap().into_iter().map(|e| e.kind).collect()
}

#[test]
fn append_preserves_order() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    spool.append("task.status", json!({"taskId": "t1", "status": "running"})).unwrap();
    spool.append("task.note", json!({"taskId": "t1", "note": "hi"})).unwrap();

    let entries = spool.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, "task.status");
    assert_eq!(entries[1].payload["note"], "hi");
}

#[test]
fn cap_discards_oldest_and_keeps_newest() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 400);
    for i in 0..20 {
        spool.append(&format!("op{i}"), json!({"n": i})).unwrap();
    }

    let size = std::fs::metadata(spool.path()).unwrap().len();
    assert!(size <= 400, "spool is {size} bytes");
    let kinds = kinds(&spool);
    assert_eq!(kinds.last().map(String::as_str), Some("op19"));
    assert!(kinds.len() < 20);
    // Survivors are a contiguous newest suffix.
    let first: usize = kinds[0].trim_start_matches("op").parse().unwrap();
    let expected: Vec<_> = (first..20).map(|i| format!("op{i}")).collect();
    assert_eq!(kinds, expected);
}

#[test]
fn oversized_entry_is_rejected() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 64);
    let err = spool.append("task.note", json!({"note": "x".repeat(200)})).unwrap_err();
    assert!(matches!(err, SpoolError::EntryTooLarge { cap: 64, .. }));
    assert!(!spool.path().exists());
}

#[tokio::test]
async fn drain_replays_and_deletes_empty_spool() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    spool.append("a", json!({})).unwrap();
    spool.append("b", json!({})).unwrap();

    let mut seen = Vec::new();
    let report = spool
        .drain(200, |entry| {
            seen.push(entry.kind);
            async { Replay::Done }
        })
        .await
        .unwrap();

    assert_eq!(seen, vec!["a", "b"]);
    assert_eq!(report.replayed, 2);
    assert_eq!(report.retained, 0);
    assert!(!spool.path().exists());
    assert!(!spool.path().with_extension("draining").exists());
}

#[tokio::test]
async fn drain_drops_invalid_and_unknown_but_keeps_retries() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    spool.append("keep", json!({"n": 1})).unwrap();
    std::fs::OpenOptions::new()
        .append(true)
        .open(spool.path())
        .unwrap()
        .write_all(b"{not json\n")
        .unwrap();
    spool.append("mystery", json!({})).unwrap();
    spool.append("ok", json!({})).unwrap();

    let report = spool
        .drain(200, |entry| async move {
            match entry.kind.as_str() {
                "keep" => Replay::Retry,
                "mystery" => Replay::Unknown,
                _ => Replay::Done,
            }
        })
        .await
        .unwrap();

    assert_eq!(
        report,
        DrainReport {
            replayed: 1,
            retained: 1,
            dropped_invalid: 1,
            dropped_unknown: 1,
            skipped: false
        }
    );
    assert_eq!(kinds(&spool), vec!["keep"]);
}

#[tokio::test]
async fn drain_respects_max_entries() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    for kind in ["a", "b", "c", "d"] {
        spool.append(kind, json!({})).unwrap();
    }

    let report = spool.drain(2, |_| async { Replay::Done }).await.unwrap();
    assert_eq!(report.replayed, 2);
    assert_eq!(report.retained, 2);
    assert_eq!(kinds(&spool), vec!["c", "d"]);
}

#[tokio::test]
async fn appends_during_drain_land_after_retained_entries() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    spool.append("old", json!({})).unwrap();

    let writer = spool.clone();
    spool
        .drain(200, |_| {
            writer.append("new", json!({})).unwrap();
            async { Replay::Retry }
        })
        .await
        .unwrap();

    assert_eq!(kinds(&spool), vec!["old", "new"]);
}

#[tokio::test]
async fn concurrent_drain_is_skipped() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    spool.append("a", json!({})).unwrap();

    let held = spool.claims.acquire(DRAIN_CLAIM_KEY, DRAIN_CLAIM_TTL).unwrap().into_claim();
    assert!(held.is_some());
    let report = spool.drain(200, |_| async { Replay::Done }).await.unwrap();
    assert!(report.skipped);
    assert_eq!(kinds(&spool), vec!["a"]);
}

#[tokio::test]
async fn interrupted_drain_is_resumed() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    spool.append("leftover", json!({})).unwrap();
    std::fs::rename(spool.path(), spool.path().with_extension("draining")).unwrap();
    spool.append("fresh", json!({})).unwrap();

    let mut seen = Vec::new();
    spool
        .drain(200, |entry| {
            seen.push(entry.kind);
            async { Replay::Retry }
        })
        .await
        .unwrap();

    assert_eq!(seen, vec!["leftover"]);
    assert_eq!(kinds(&spool), vec!["leftover", "fresh"]);
}

#[tokio::test]
async fn draining_missing_spool_is_a_no_op() {
    let dir = tempdir().unwrap();
    let spool = spool(dir.path(), 1 << 20);
    let report = spool.drain(200, |_| async { Replay::Done }).await.unwrap();
    assert_eq!(report, DrainReport::default());
}
