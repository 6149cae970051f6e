//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] covrun::CovError),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Environment check failed
    #[error("Environment check failed: {message}")]
    Doctor {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a doctor error
    #[must_use]
    pub fn doctor(message: impl Into<String>) -> Self {
        Self::Doctor {
            message: message.into(),
        }
    }

    /// Process exit code: a failed tool's own code when it fits, else 1
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Pipeline(err) => err
                .exit_code()
                .and_then(|c| u8::try_from(c).ok())
                .filter(|c| *c != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}
