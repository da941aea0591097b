//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in production code, only waits on I/O and timers
//! - The core stays headless: no printing, no terminal crates
//! - Errors are propagated, not unwrapped
//!
//! The helpers here walk the workspace sources and hand the production part
//! of each file to the checks in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file below `dir` (relative to the workspace root)
pub fn rust_sources(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Code lines that ship, as `(line_number, code)`
///
/// Stops at the first `#[cfg(test)]` and drops `//` comments.
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line.split("//").next().unwrap_or(line)))
        .filter(|(_, code)| !code.trim().is_empty())
        .collect()
}

/// Lines of production code in `dirs` matching `is_violation`
pub fn find_violations(dirs: &[&str], is_violation: impl Fn(&str) -> bool) -> Vec<String> {
    let mut violations = Vec::new();
    for dir in dirs {
        for path in rust_sources(dir) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            for (line_number, code) in production_lines(&content) {
                if is_violation(code) {
                    violations.push(format!(
                        "{}:{} - {}",
                        path.display(),
                        line_number,
                        code.trim()
                    ));
                }
            }
        }
    }
    violations
}

/// Panic with a readable report when `violations` is not empty
pub fn report(what: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {what}:\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) of: {what}.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n// note\nlet x = 1; // trailing\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(content);
        assert_eq!(lines, vec![(1, "fn a() {}"), (3, "let x = 1; ")]);
    }

    #[test]
    fn test_workspace_root_holds_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
        assert!(!rust_sources("conductor/core/src").is_empty());
    }
}
