//! Architectural Enforcement Integration Tests
//!
//! This package contains source-scanning tests that enforce how the kiosk is
//! put together:
//! - No blocking or polling sleeps in production code
//! - The committed queue is mutated only by the coordinator's commit step
//! - No ambient mutable globals
//! - The core stays free of terminal dependencies
//!
//! The helpers here are shared by the tests under `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, resolved from this package's manifest
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file below `dir` (relative to the workspace root)
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// A line of production code
#[derive(Debug, PartialEq, Eq)]
pub struct CodeLine<'a> {
    /// 1-based line number
    pub number: usize,
    /// The line with any `//` comment removed
    pub code: &'a str,
}

/// Production lines of a source file
///
/// Stops at the first `#[cfg(test)]`; test modules sit at the end of a file.
/// Doc and line comments are dropped.
pub fn production_lines(content: &str) -> Vec<CodeLine<'_>> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .filter_map(|(idx, line)| {
            let code = line.split("//").next().unwrap_or(line);
            (!code.trim().is_empty()).then_some(CodeLine {
                number: idx + 1,
                code,
            })
        })
        .collect()
}

/// `path:line - code` for every production line matching `pred`
pub fn find_violations<F>(dirs: &[&str], mut pred: F) -> Vec<String>
where
    F: FnMut(&Path, &[CodeLine<'_>], usize) -> bool,
{
    let mut violations = Vec::new();
    for dir in dirs {
        for path in rust_files(dir) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let lines = production_lines(&content);
            for (idx, line) in lines.iter().enumerate() {
                if pred(&path, &lines, idx) {
                    violations.push(format!(
                        "{}:{} - {}",
                        path.display(),
                        line.number,
                        line.code.trim()
                    ));
                }
            }
        }
    }
    violations
}

/// Panic listing every violation, if there are any
pub fn report(rule: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    for violation in violations {
        eprintln!("  {violation}");
    }
    panic!("{rule}: {} violation(s)", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_tests() {
        let src = "fn a() {}\n// note\nlet x = 1; // trailing\n#[cfg(test)]\nfn b() {}\n";
        let lines = production_lines(src);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].code, "let x = 1; ");
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}
