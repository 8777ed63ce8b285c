//! Integration Test: Sleep and Panic Prohibition
//!
//! **Policy**: production code never waits on a timer to paper over ordering,
//! and never panics on a recoverable error.
//! **Required**: coordinate with locks/channels; propagate errors with `?`.

use architectural_enforcement::{fail_on, production_sources};

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for source in production_sources() {
        for idx in 0..source.lines.len() {
            let code = source.code(idx);
            if code.contains("thread::sleep") || code.contains("time::sleep") || code.contains("sleep(")
            {
                violations.push(source.violation(idx, "sleep() call"));
            }
        }
    }

    fail_on(
        &violations,
        "sleep() in production code",
        "Wait on the thing you need (a lock, a channel, a future) instead of a timer",
    );
}

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();

    for source in production_sources() {
        for idx in 0..source.lines.len() {
            let code = source.code(idx);
            if code.contains(".unwrap()") {
                violations.push(source.violation(idx, "unwrap()"));
            }
            if code.contains(".expect(") {
                violations.push(source.violation(idx, "expect()"));
            }
        }
    }

    fail_on(
        &violations,
        "unwrap()/expect() in production code",
        "Return a CatalogError (library) or add anyhow context (binary)",
    );
}
