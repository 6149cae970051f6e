//! Error types for covrun

use crate::pipeline::Step;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for covrun operations
pub type CovResult<T> = Result<T, CovError>;

/// Errors that can occur while running the coverage pipeline
#[derive(Debug, Error)]
pub enum CovError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Config file could not be parsed
    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        /// Path of the offending file
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// Invalid glob or regex pattern
    #[error("Invalid pattern `{pattern}`: {message}")]
    Pattern {
        /// The pattern as written
        pattern: String,
        /// Parser message
        message: String,
    },

    /// External tool could not be started
    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A pipeline step exited unsuccessfully
    #[error("Step `{step}` failed{}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    StepFailed {
        /// Step that failed
        step: Step,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CovError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a pattern error
    #[must_use]
    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a spawn error
    #[must_use]
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Exit code of the failed external step, if any
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::StepFailed { code, .. } => *code,
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CovError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_pattern_error() {
        let err = CovError::pattern("[", "unclosed class");
        assert_eq!(err.to_string(), "Invalid pattern `[`: unclosed class");
    }

    #[test]
    fn test_spawn_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = CovError::spawn("grcov", io);
        assert!(err.to_string().contains("`grcov`"));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_step_failed_with_code() {
        let err = CovError::StepFailed {
            step: Step::Test,
            code: Some(101),
        };
        assert_eq!(err.to_string(), "Step `test` failed with exit code 101");
        assert_eq!(err.exit_code(), Some(101));
    }

    #[test]
    fn test_step_failed_by_signal() {
        let err = CovError::StepFailed {
            step: Step::Report,
            code: None,
        };
        assert_eq!(err.to_string(), "Step `report` failed");
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CovError = io_err.into();
        assert!(err.to_string().contains("I/O"));
        assert!(err.exit_code().is_none());
    }
}
