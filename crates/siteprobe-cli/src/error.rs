//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// No scenario matched the filter
    #[error("No scenario matches {filter:?}")]
    NoScenarios {
        /// Filter that matched nothing
        filter: String,
    },

    /// Browser support compiled out
    #[error("Browser support not enabled. Rebuild with --features browser")]
    BrowserDisabled,

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness error
    #[error("siteprobe error: {0}")]
    Probe(#[from] siteprobe::ProbeError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
