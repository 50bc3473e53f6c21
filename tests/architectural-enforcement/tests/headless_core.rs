//! Integration Test: Headless Core
//!
//! **Policy**: `magic-core` owns session and animation logic only. Terminal
//! crates belong to `magic-tui`, so the core can sit under any front-end.

use architectural_enforcement::{sources, violation, workspace_root};

const TERMINAL_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_sources_do_not_use_terminal_crates() {
    let mut violations = Vec::new();

    for file in sources("core/src") {
        for (line, code) in file.code_lines() {
            if TERMINAL_CRATES.iter().any(|name| code.contains(&format!("{name}::"))) {
                violations.push(violation(&file, line, code));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Terminal crates used in magic-core:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_core_manifest_has_no_terminal_dependencies() {
    let manifest = std::fs::read_to_string(workspace_root().join("core/Cargo.toml"))
        .expect("core/Cargo.toml should exist");

    for name in TERMINAL_CRATES {
        assert!(
            !manifest
                .lines()
                .any(|line| line.trim_start().starts_with(&format!("{name} "))
                    || line.trim_start().starts_with(&format!("{name}="))),
            "magic-core must not depend on {name}"
        );
    }
}

#[test]
fn test_sources_are_found() {
    assert!(!sources("core/src").is_empty());
    assert!(!sources("tui/src").is_empty());
}
