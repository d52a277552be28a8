//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code waits on I/O, channels, intervals and
//! deadlines, never on sleeps.
//! **Exceptions**: the websocket reconnect backoff in the core.

use architectural_enforcement::{find_violations, report};

/// Lines before a sleep that may establish a backoff context
const BACKOFF_WINDOW: usize = 3;

#[test]
fn test_no_blocking_sleep_anywhere() {
    let violations = find_violations(&["kiosk/core/src", "tui/src"], |_, lines, idx| {
        lines[idx].code.contains("thread::sleep(")
    });
    report("blocking sleep in production code", &violations);
}

#[test]
fn test_async_sleep_only_for_reconnect_backoff() {
    let violations = find_violations(&["kiosk/core/src"], |_, lines, idx| {
        let code = lines[idx].code;
        if !code.contains("::sleep(") {
            return false;
        }
        let start = idx.saturating_sub(BACKOFF_WINDOW);
        !lines[start..=idx]
            .iter()
            .any(|line| line.code.to_lowercase().contains("backoff"))
    });
    report("sleep outside reconnect backoff", &violations);
}

#[test]
fn test_surface_never_sleeps() {
    // Frames are paced by an interval, arrivals by timestamps
    let violations = find_violations(&["tui/src"], |_, lines, idx| {
        let code = lines[idx].code;
        code.contains("::sleep(") || code.contains("sleep_until(")
    });
    report("sleep in the terminal surface", &violations);
}
