//! Result and error types for siteprobe.

use thiserror::Error;

/// Result type for siteprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page or driver error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A bounded wait elapsed
    #[error("{operation} timed out after {ms}ms: {reason}")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
        /// Last observed reason the operation could not complete
        reason: String,
    },

    /// A polling assertion did not hold within its timeout
    #[error("Assertion {assertion} failed after {timeout_ms}ms on {target}: expected {expected}, got {actual}")]
    AssertionFailed {
        /// Assertion name, e.g. `to_have_value`
        assertion: String,
        /// Locator or page description
        target: String,
        /// Expected value
        expected: String,
        /// Last observed value
        actual: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// A locator matched nothing when one element was required
    #[error("Element not found: {selector} (waited {timeout_ms}ms)")]
    ElementNotFound {
        /// Locator description
        selector: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// A locator matched more than one element for a single-element operation
    #[error("Strict mode violation: {selector} resolved to {count} elements")]
    StrictModeViolation {
        /// Locator description
        selector: String,
        /// Number of matched elements
        count: usize,
    },

    /// The element exists but is not ready for the action yet
    #[error("Element {selector} is not actionable: {reason}")]
    NotActionable {
        /// Locator description
        selector: String,
        /// Why the action cannot run yet
        reason: String,
    },

    /// Another element would receive the pointer event
    #[error("Element {selector} is covered by {intercepted_by}")]
    Intercepted {
        /// Locator description
        selector: String,
        /// Description of the covering element
        intercepted_by: String,
    },

    /// Script evaluation error
    #[error("Evaluation failed: {message}")]
    EvaluationError {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Whether an auto-waiting operation should poll again after this error
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotActionable { .. } | Self::Intercepted { .. })
    }

    /// Whether this error is a timeout of any kind
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}
