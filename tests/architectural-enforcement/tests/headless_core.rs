//! Integration Test: Headless Core
//!
//! **Policy**: `coursechat-core` never talks to a terminal. Everything a
//! surface shows goes through `ConductorMessage`, diagnostics go through
//! `tracing`, and failures are returned rather than unwrapped.

use std::fs;

use architectural_enforcement::{find_violations, report, workspace_root};

const CORE_DIRS: &[&str] = &["conductor/core/src"];

/// Crates that only make sense in a surface
const SURFACE_CRATES: &[&str] = &[
    "ratatui",
    "crossterm",
    "textwrap",
    "clap",
    "tracing-subscriber",
];

#[test]
fn test_core_does_not_print() {
    let violations = find_violations(CORE_DIRS, |code| {
        ["println!", "eprintln!", "print!(", "eprint!(", "dbg!("]
            .iter()
            .any(|m| code.contains(m))
    });
    report("direct printing in the core", &violations);
}

#[test]
fn test_core_does_not_unwrap() {
    let violations = find_violations(CORE_DIRS, |code| {
        code.contains(".unwrap()") || code.contains(".expect(")
    });
    report("unwrap/expect in core production code", &violations);
}

#[test]
fn test_core_has_no_surface_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml"))
        .expect("core manifest");
    let dependencies = manifest
        .split("[dev-dependencies]")
        .next()
        .unwrap_or(&manifest);

    let found: Vec<String> = SURFACE_CRATES
        .iter()
        .filter(|name| {
            dependencies
                .lines()
                .any(|line| line.trim_start().starts_with(&format!("{name} ")))
        })
        .map(|name| (*name).to_string())
        .collect();

    report("surface crates in the core manifest", &found);
}
