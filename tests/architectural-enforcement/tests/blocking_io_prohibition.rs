//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code in the catalogue MUST NOT block the runtime.
//! **Required**: use `tokio::fs`, `tokio::net`, `tokio::process` inside `async fn`.
//!
//! Blocking calls in plain functions (config loading before the runtime
//! matters, CLI parsing) are allowed.

use architectural_enforcement::{fail_on, production_sources};

const BLOCKING: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::thread::spawn", "OS thread spawn"),
];

#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();

    for source in production_sources() {
        for idx in 0..source.lines.len() {
            let code = source.code(idx);
            for (pattern, what) in BLOCKING {
                if code.contains(pattern) && source.in_async_fn(idx) {
                    violations.push(source.violation(idx, what));
                }
            }
        }
    }

    fail_on(
        &violations,
        "Blocking I/O inside async functions",
        "Use tokio::fs / tokio::net / tokio::process, or move the call out of async code",
    );
}

#[test]
fn test_no_blocking_fs_imports() {
    let mut violations = Vec::new();

    for source in production_sources() {
        for idx in 0..source.lines.len() {
            let code = source.code(idx);
            if code.starts_with("use std::fs") || code.starts_with("use std::net") {
                violations.push(source.violation(idx, "Blocking I/O import"));
            }
        }
    }

    fail_on(
        &violations,
        "Module-wide blocking I/O imports",
        "Spell out std::fs:: at the (non-async) call site so it stays visible",
    );
}
