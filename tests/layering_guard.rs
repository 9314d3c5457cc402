//! Layering guardrails to keep the tree crate free of IO and async machinery.
//!
//! `guit_core` holds the composite tree and typed collection. Discovery, building and reporting
//! live in the `guit` crate. This test scans `crates/guit_core/Cargo.toml` and fails if a runtime
//! or IO crate appears in its `[dependencies]`.

const FORBIDDEN: &[&str] = &["tokio", "async-trait", "serde_json", "walkdir", "regex", "tracing", "guit"];

#[test]
fn core_does_not_depend_on_runtime_crates() {
    let manifest = include_str!("../crates/guit_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            if line == "[dependencies]" {
                in_dependencies = true;
                continue;
            }
            if in_dependencies {
                break;
            }
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        let name = line_no_comment.split(['=', ' ']).next().unwrap_or("");
        if FORBIDDEN.contains(&name) {
            panic!("`{name}` must not appear in guit_core's [dependencies]");
        }
    }
}
