//! Integration Test: Commit Ownership
//!
//! **Policy**: the committed queue (snapshot plus occupant count) is replaced
//! only inside the coordinator's commit step. Everyone else reads it through
//! accessors or the commit observer.

use std::fs;
use std::path::Path;

use architectural_enforcement::{find_violations, report, workspace_root};

const SOURCES: &[&str] = &["kiosk/core/src", "tui/src"];

fn is_coordinator(path: &Path) -> bool {
    path.ends_with("kiosk/core/src/coordinator.rs")
}

#[test]
fn test_committed_view_built_only_by_coordinator() {
    let violations = find_violations(SOURCES, |path, lines, idx| {
        let code = lines[idx].code;
        let builds = code.contains("CommittedView {") && !code.contains("struct CommittedView");
        builds && !is_coordinator(path)
    });
    report("CommittedView constructed outside the coordinator", &violations);
}

#[test]
fn test_committed_field_assigned_only_by_coordinator() {
    let violations = find_violations(SOURCES, |path, lines, idx| {
        let code = lines[idx].code;
        let assigns = code.contains(".committed =") || code.contains(".committed.last_count =");
        assigns && !is_coordinator(path)
    });
    report("committed queue assigned outside the coordinator", &violations);
}

#[test]
fn test_commit_observer_fed_only_by_coordinator() {
    let violations = find_violations(SOURCES, |path, lines, idx| {
        lines[idx].code.contains("send_replace(") && !is_coordinator(path)
    });
    report("commit observer written outside the coordinator", &violations);
}

#[test]
fn test_no_ambient_mutable_globals() {
    let violations = find_violations(SOURCES, |_, lines, idx| {
        lines[idx].code.contains("static mut ")
    });
    report("mutable global state", &violations);
}

#[test]
fn test_core_has_no_terminal_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("kiosk/core/Cargo.toml"))
        .expect("core manifest is readable");
    for forbidden in ["ratatui", "crossterm"] {
        assert!(
            !manifest.contains(forbidden),
            "kiosk-core must not depend on {forbidden}"
        );
    }

    let violations = find_violations(&["kiosk/core/src"], |_, lines, idx| {
        let code = lines[idx].code;
        code.contains("use ratatui") || code.contains("use crossterm")
    });
    report("terminal crate used in the core", &violations);
}
