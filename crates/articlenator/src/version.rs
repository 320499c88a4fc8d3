//! Build version reporting.

use std::process::Command;
use std::sync::OnceLock;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const UNKNOWN_COMMIT: &str = "unknown";

/// Short git commit, from `GIT_COMMIT` or `git rev-parse HEAD`.
pub fn git_commit() -> &'static str {
    static COMMIT: OnceLock<String> = OnceLock::new();
    COMMIT.get_or_init(|| {
        let raw = std::env::var("GIT_COMMIT")
            .ok()
            .filter(|c| !c.trim().is_empty())
            .or_else(commit_from_git);
        short_commit(raw.as_deref())
    })
}

/// Version string like `0.1.0 (abc12345)`.
pub fn version_string() -> String {
    format!("{VERSION} ({})", git_commit())
}

fn commit_from_git() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

fn short_commit(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(c) if !c.is_empty() => c.chars().take(8).collect(),
        _ => UNKNOWN_COMMIT.to_string(),
    }
}
