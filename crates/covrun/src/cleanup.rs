//! Stale instrumentation cleanup
//!
//! Counter files from a previous run would be merged into the next report,
//! so they are removed before every instrumented test run. Removal is
//! best-effort: a file that cannot be deleted is reported, not fatal.

use crate::error::{CovError, CovResult};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default artifact pattern for gcov counter files
pub const GCDA_PATTERN: &str = "**/*.gcda";

/// What to delete and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPlan {
    /// Directory searched recursively
    pub root: PathBuf,
    /// Glob patterns relative to `root`
    pub patterns: Vec<String>,
}

impl Default for CleanupPlan {
    fn default() -> Self {
        Self::new("target/debug")
    }
}

/// A file that matched but could not be removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// File path
    pub path: PathBuf,
    /// OS error message
    pub message: String,
}

/// Result of a cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Files removed
    pub removed: Vec<PathBuf>,
    /// Total size of removed files in bytes
    pub bytes: u64,
    /// Files that matched but survived
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// Number of removed files
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Whether every matching file was removed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl CleanupPlan {
    /// Plan the default `.gcda` sweep under `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: vec![GCDA_PATTERN.to_string()],
        }
    }

    /// Replace the pattern list
    #[must_use]
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Check every pattern parses
    pub fn validate(&self) -> CovResult<()> {
        for pattern in &self.patterns {
            Pattern::new(pattern).map_err(|e| CovError::pattern(pattern, e.msg))?;
        }
        Ok(())
    }

    /// Regular files currently matching the plan, sorted and deduplicated
    pub fn matches(&self) -> CovResult<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let root = Pattern::escape(&self.root.to_string_lossy());
        let mut found = Vec::new();
        for pattern in &self.patterns {
            let full = format!("{root}/{pattern}");
            let paths = glob::glob_with(&full, options)
                .map_err(|e| CovError::pattern(pattern, e.msg))?;
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => found.push(path),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(path = %e.path().display(), "unreadable during cleanup scan");
                    }
                }
            }
        }
        found.sort();
        found.dedup();
        Ok(found)
    }

    /// Delete every matching file
    pub fn execute(&self) -> CovResult<CleanupReport> {
        let mut report = CleanupReport::default();
        for path in self.matches()? {
            let size = file_size(&path);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    report.bytes += size;
                    report.removed.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove stale artifact");
                    report.failures.push(CleanupFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            root = %self.root.display(),
            removed = report.removed_count(),
            bytes = report.bytes,
            "cleanup finished"
        );
        Ok(report)
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
