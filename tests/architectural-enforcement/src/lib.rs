//! Architectural Enforcement
//!
//! Source scanners backing the integration tests in `tests/`. They enforce
//! that the engine runs on virtual time only:
//! - No wall-clock reads in engine code
//! - No sleeping, neither threads nor timers, outside the runtime actor
//!
//! The scanners are line-based. Comments are skipped, and everything from a
//! `#[cfg(test)]` marker to the end of the file is treated as test code.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Calls that read the wall clock
pub const WALL_CLOCK_CALLS: &[&str] = &[
    "SystemTime::now",
    "Utc::now",
    "Local::now",
    "Instant::now",
];

/// Calls that block or park the caller for a fixed time
pub const SLEEP_CALLS: &[&str] = &["thread::sleep", "time::sleep(", "time::sleep_until("];

/// A forbidden call found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File, relative to the workspace root when possible
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The forbidden call that matched
    pub call: &'static str,
    /// Trimmed source line
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} [{}] {}",
            self.path.display(),
            self.line,
            self.call,
            self.text
        )
    }
}

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Scan one source text for `calls`
pub fn scan_source(path: &Path, content: &str, calls: &[&'static str]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        // Test module runs to the end of the file
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }

        let code = line.split("//").next().unwrap_or(line);
        for &call in calls {
            if code.contains(call) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    call,
                    text: trimmed.to_string(),
                });
            }
        }
    }

    violations
}

/// Scan every `.rs` file under `dir`, skipping files whose path ends with
/// one of `exempt`
pub fn scan_dir(dir: &Path, calls: &[&'static str], exempt: &[&str]) -> Vec<Violation> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        if exempt.iter().any(|e| path.ends_with(e)) {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        let shown = path.strip_prefix(&root).unwrap_or(path);
        violations.extend(scan_source(shown, &content, calls));
    }

    violations
}

/// Panic with a readable report if `violations` is non-empty
pub fn assert_clean(what: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n{what} found in production code:\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    eprintln!("\nEngine code must take time from the conductor's virtual clock.");

    panic!(
        "\nFound {} violation(s) of: {what}.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
//! The engine never calls Utc::now()
fn engine() {
    let at = std::time::Instant::now();
    // std::thread::sleep(d) would block
    std::thread::sleep(d);
}

#[cfg(test)]
mod tests {
    fn helper() {
        let _ = chrono::Utc::now();
    }
}
"#;

    #[test]
    fn test_detects_calls_outside_comments() {
        let found = scan_source(Path::new("sample.rs"), SAMPLE, WALL_CLOCK_CALLS);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 4);
        assert_eq!(found[0].call, "Instant::now");

        let found = scan_source(Path::new("sample.rs"), SAMPLE, SLEEP_CALLS);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 6);
    }

    #[test]
    fn test_tokio_sleep_matches() {
        let src = "async fn f() { tokio::time::sleep(d).await; }";
        let found = scan_source(Path::new("f.rs"), src, SLEEP_CALLS);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].call, "time::sleep(");
    }

    #[test]
    fn test_violation_display() {
        let v = Violation {
            path: PathBuf::from("conductor/core/src/x.rs"),
            line: 7,
            call: "Utc::now",
            text: "let t = Utc::now();".into(),
        };
        assert_eq!(
            v.to_string(),
            "conductor/core/src/x.rs:7 [Utc::now] let t = Utc::now();"
        );
    }

    #[test]
    fn test_workspace_root_holds_engine() {
        assert!(workspace_root().join("conductor/core/src").is_dir());
    }
}
