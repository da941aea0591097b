//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the core and the terminal client MUST NOT
//! call sleep methods. Waiting is done on I/O, channels or
//! `tokio::time::timeout`.
//! **Exceptions**: test code.

use architectural_enforcement::{find_violations, report};

const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "conductor/cli/src"];

fn is_sleep(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, is_sleep);
    report("sleep calls in production code", &violations);
}

#[test]
fn test_no_blocking_http_client() {
    let violations = find_violations(PRODUCTION_DIRS, |code| code.contains("reqwest::blocking"));
    report("blocking HTTP client in production code", &violations);
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep("    tokio::time::sleep(Duration::from_millis(10)).await;"));
    assert!(is_sleep("    std::thread::sleep(delay);"));
    assert!(!is_sleep("    tokio::time::timeout(after, rx.recv()).await"));
}
