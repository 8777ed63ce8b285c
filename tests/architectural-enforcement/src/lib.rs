//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the catalogue's production sources:
//! - No blocking I/O inside async functions
//! - No sleep() calls
//! - No unwrap()/expect() outside tests
//!
//! The helpers here do line-oriented scanning, not parsing. They rely on two
//! conventions of the code base: unit tests live in a trailing `#[cfg(test)]`
//! module, and function signatures start on their own line.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["catalog/core/src", "catalog/admin/src"];

/// Workspace root, derived from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// One production source file, with its test module cut off
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Lines before the first `#[cfg(test)]`
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Code part of line `idx`: comments removed, trimmed
    #[must_use]
    pub fn code(&self, idx: usize) -> &str {
        let line = self.lines[idx].trim();
        if line.starts_with("//") {
            return "";
        }
        line.split(" //").next().unwrap_or(line).trim()
    }

    /// Whether line `idx` sits inside an `async fn`
    ///
    /// Scans back to the nearest function signature.
    #[must_use]
    pub fn in_async_fn(&self, idx: usize) -> bool {
        for i in (0..=idx).rev() {
            let line = self.code(i);
            if line.starts_with("fn ") || line.contains(" fn ") || line.starts_with("async fn ") {
                return line.contains("async fn");
            }
            if line.starts_with("impl ") || line.starts_with("mod ") {
                return false;
            }
        }
        false
    }

    /// Format a violation at line `idx`
    #[must_use]
    pub fn violation(&self, idx: usize, what: &str) -> String {
        format!(
            "{}:{} - {}: {}",
            self.path.display(),
            idx + 1,
            what,
            self.lines[idx].trim()
        )
    }
}

/// Load every `.rs` file under the production directories
///
/// # Panics
///
/// Panics if a production directory is missing, so a moved crate cannot make
/// the checks pass vacuously.
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.is_dir(), "production directory {} not found", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let lines = content
                .lines()
                .take_while(|line| line.trim() != "#[cfg(test)]")
                .map(str::to_string)
                .collect();
            files.push(SourceFile {
                path: entry
                    .path()
                    .strip_prefix(&root)
                    .unwrap_or(entry.path())
                    .to_path_buf(),
                lines,
            });
        }
    }
    files
}

/// Report violations and fail
///
/// # Panics
///
/// Panics whenever `violations` is non-empty.
pub fn fail_on(violations: &[String], rule: &str, fix: &str) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!("\n✅ {fix}");
    panic!("\nFound {} violation(s) of: {rule}", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(lines: &[&str]) -> SourceFile {
        SourceFile {
            path: PathBuf::from("x.rs"),
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    #[test]
    fn test_async_detection() {
        let src = file(&[
            "impl Store {",
            "    pub async fn load(&self) {",
            "        let x = 1;",
            "    }",
            "    fn sync_one() {",
            "        let y = 2;",
            "    }",
            "}",
        ]);
        assert!(src.in_async_fn(2));
        assert!(!src.in_async_fn(5));
    }

    #[test]
    fn test_comments_are_ignored() {
        let src = file(&["// std::fs::read", "let a = 1; // .unwrap()"]);
        assert_eq!(src.code(0), "");
        assert_eq!(src.code(1), "let a = 1;");
    }

    #[test]
    fn test_production_sources_exist() {
        let sources = production_sources();
        assert!(sources.iter().any(|s| s.path.ends_with("router.rs")));
    }
}
