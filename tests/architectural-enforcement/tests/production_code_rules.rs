//! Integration Test: Production Code Rules
//!
//! **Policy**:
//! - No sleep calls in production code. Exceptions: the TUI frame loop and
//!   the scripted channel, whose job is timed playback.
//! - No `std::thread::sleep` anywhere in production code.
//! - No `unwrap()`/`expect()` in production code; errors are propagated or
//!   recorded on the session.

use std::path::Path;

use architectural_enforcement::{sources, violation};

/// Files allowed to await `tokio::time::sleep`
const SLEEP_ALLOWED: &[&str] = &["tui/src/app.rs", "core/src/channel/scripted.rs"];

const PRODUCTION_DIRS: &[&str] = &["core/src", "tui/src"];

fn is_sleep_allowed(path: &Path) -> bool {
    SLEEP_ALLOWED.iter().any(|allowed| path.ends_with(allowed))
}

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for file in sources(dir) {
            for (line, code) in file.code_lines() {
                if code.contains("thread::sleep(") {
                    violations.push(violation(&file, line, code));
                } else if (code.contains("::sleep(") || code.contains(".sleep("))
                    && !is_sleep_allowed(&file.path)
                {
                    violations.push(violation(&file, line, code));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Sleep calls found in production code:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for file in sources(dir) {
            for (line, code) in file.code_lines() {
                if code.contains(".unwrap()") || code.contains(".expect(") {
                    violations.push(violation(&file, line, code));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "unwrap()/expect() found in production code:\n{}",
        violations.join("\n")
    );
}
