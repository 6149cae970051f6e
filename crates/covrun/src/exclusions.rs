//! grcov exclusion patterns
//!
//! Line and branch coverage always receive the same patterns, so a derive or
//! a test module that is hidden from line counts is hidden from branch
//! counts too.

use crate::error::{CovError, CovResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default line exclusion: derive attributes
pub const DERIVE_LINE: &str = r"#\[derive\(";

/// Default region start: inline test modules
pub const TEST_MODULE_START: &str = r"mod tests \{";

/// Regex patterns excluded from coverage accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionSet {
    /// Lines matching any of these are excluded
    pub line: Vec<String>,
    /// A line matching any of these opens an excluded region
    pub start: Vec<String>,
    /// A line matching any of these closes an excluded region
    pub stop: Vec<String>,
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self {
            line: vec![DERIVE_LINE.to_string()],
            start: vec![TEST_MODULE_START.to_string()],
            stop: Vec::new(),
        }
    }
}

impl ExclusionSet {
    /// An empty set
    #[must_use]
    pub fn none() -> Self {
        Self {
            line: Vec::new(),
            start: Vec::new(),
            stop: Vec::new(),
        }
    }

    /// Add a line pattern
    #[must_use]
    pub fn with_line(mut self, pattern: impl Into<String>) -> Self {
        self.line.push(pattern.into());
        self
    }

    /// Add a region start pattern
    #[must_use]
    pub fn with_start(mut self, pattern: impl Into<String>) -> Self {
        self.start.push(pattern.into());
        self
    }

    /// Add a region stop pattern
    #[must_use]
    pub fn with_stop(mut self, pattern: impl Into<String>) -> Self {
        self.stop.push(pattern.into());
        self
    }

    /// Check every pattern compiles as a regex
    pub fn validate(&self) -> CovResult<()> {
        for pattern in self.line.iter().chain(&self.start).chain(&self.stop) {
            Regex::new(pattern).map_err(|e| CovError::pattern(pattern, e.to_string()))?;
        }
        Ok(())
    }

    /// Whether `source_line` would be excluded as a single line.
    ///
    /// Matches with the same joined regex [`Self::to_args`] hands to grcov.
    pub fn excludes_line(&self, source_line: &str) -> CovResult<bool> {
        let Some(joined) = join_alternation(&self.line) else {
            return Ok(false);
        };
        let re = Regex::new(&joined).map_err(|e| CovError::pattern(&joined, e.to_string()))?;
        Ok(re.is_match(source_line))
    }

    /// grcov arguments, each pattern kind emitted for lines and branches
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let kinds = [
            (&self.line, "--excl-line", "--excl-br-line"),
            (&self.start, "--excl-start", "--excl-br-start"),
            (&self.stop, "--excl-stop", "--excl-br-stop"),
        ];
        for (patterns, line_flag, branch_flag) in kinds {
            if let Some(joined) = join_alternation(patterns) {
                args.push(line_flag.to_string());
                args.push(joined.clone());
                args.push(branch_flag.to_string());
                args.push(joined);
            }
        }
        args
    }
}

/// grcov takes one regex per option, so several patterns become one group
fn join_alternation(patterns: &[String]) -> Option<String> {
    match patterns {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(
            many.iter()
                .map(|p| format!("(?:{p})"))
                .collect::<Vec<_>>()
                .join("|"),
        ),
    }
}
