// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

const VARS: [&str; 10] = [
    "FLEET_STATE_DIR",
    "XDG_STATE_HOME",
    "FLEET_IPC_SOCKET",
    "FLEET_IPC_TIMEOUT_MS",
    "FLEET_IPC_DOWN_CACHE_MS",
    "FLEET_IPC_SPOOL_GRACE_MS",
    "FLEET_IPC_SPOOL_MAX_BYTES",
    "FLEET_IPC_SPOOL_DRAIN_MAX",
    "FLEET_CLAIM_TTL_MS",
    "FLEET_LOG",
];

fn clear() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_apply_when_unset() {
    clear();
    assert_eq!(ipc_timeout(), Duration::from_millis(2000));
    assert_eq!(ipc_down_cache(), Duration::from_millis(5000));
    assert_eq!(spool_grace(), Duration::from_millis(10_000));
    assert_eq!(spool_max_bytes(), 5 * 1024 * 1024);
    assert_eq!(spool_drain_max(), 200);
    assert_eq!(claim_ttl(), Duration::from_secs(60));
    assert_eq!(log_filter(), "info");
    assert_eq!(ipc_socket(), None);
}

#[test]
#[serial]
fn overrides_are_parsed() {
    clear();
    std::env::set_var("FLEET_IPC_TIMEOUT_MS", "250");
    std::env::set_var("FLEET_IPC_SPOOL_MAX_BYTES", "4096");
    std::env::set_var("FLEET_IPC_SPOOL_DRAIN_MAX", "7");
    std::env::set_var("FLEET_IPC_SOCKET", "/run/fleet.sock");
    std::env::set_var("FLEET_LOG", "fleet_daemon=debug");

    assert_eq!(ipc_timeout(), Duration::from_millis(250));
    assert_eq!(spool_max_bytes(), 4096);
    assert_eq!(spool_drain_max(), 7);
    assert_eq!(ipc_socket(), Some(PathBuf::from("/run/fleet.sock")));
    assert_eq!(log_filter(), "fleet_daemon=debug");
    clear();
}

#[test]
#[serial]
fn garbage_and_zero_fall_back_to_defaults() {
    clear();
    std::env::set_var("FLEET_IPC_TIMEOUT_MS", "soon");
    std::env::set_var("FLEET_IPC_SPOOL_MAX_BYTES", "0");
    std::env::set_var("FLEET_IPC_SPOOL_DRAIN_MAX", "-1");

    assert_eq!(ipc_timeout(), DEFAULT_IPC_TIMEOUT);
    assert_eq!(spool_max_bytes(), DEFAULT_SPOOL_MAX_BYTES);
    assert_eq!(spool_drain_max(), DEFAULT_SPOOL_DRAIN_MAX);
    clear();
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    clear();
    std::env::set_var("XDG_STATE_HOME", "/xdg");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/xdg/fleet"));

    std::env::set_var("FLEET_STATE_DIR", "/srv/fleet");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/srv/fleet"));
    clear();
}
