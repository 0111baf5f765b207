//! Integration Test: Virtual Clock Enforcement
//!
//! **Policy**: Engine code takes time only from the conductor's virtual clock.
//! It never reads the wall clock and never sleeps.
//! **Exceptions**: `runtime.rs`, the tokio actor that maps tokio time onto
//! engine milliseconds; the daemon may read the wall clock once for the epoch.

use architectural_enforcement::{
    assert_clean, scan_dir, workspace_root, SLEEP_CALLS, WALL_CLOCK_CALLS,
};

/// Files allowed to touch tokio time
const RUNTIME_EXEMPT: &[&str] = &["src/runtime.rs"];

#[test]
fn test_no_wall_clock_in_engine() {
    let dir = workspace_root().join("conductor/core/src");
    assert!(dir.is_dir(), "engine sources not found at {dir:?}");

    let violations = scan_dir(&dir, WALL_CLOCK_CALLS, RUNTIME_EXEMPT);
    assert_clean("Wall-clock reads", &violations);
}

#[test]
fn test_no_sleep_in_engine() {
    let dir = workspace_root().join("conductor/core/src");
    let violations = scan_dir(&dir, SLEEP_CALLS, RUNTIME_EXEMPT);
    assert_clean("Sleep calls", &violations);
}

#[test]
fn test_no_sleep_in_daemon() {
    let dir = workspace_root().join("conductor/daemon/src");
    let violations = scan_dir(&dir, SLEEP_CALLS, &[]);
    assert_clean("Sleep calls", &violations);
}
