//! Result and error types for Popshot.

use thiserror::Error;

/// Result type for Popshot operations
pub type PopshotResult<T> = Result<T, PopshotError>;

/// Errors that can occur during a verification run.
///
/// Every variant aborts the current run; none are retried.
#[derive(Debug, Error)]
pub enum PopshotError {
    /// Browser, profile directory or extension failed to start
    #[error("Failed to launch browser: {message}")]
    Launch {
        /// Error message
        message: String,
    },

    /// No service worker registered, or its address could not be parsed
    #[error("Could not resolve extension identity: {message}")]
    IdentityResolution {
        /// Error message
        message: String,
    },

    /// Navigation target unreachable
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A step's wait condition never became true within its budget
    #[error("Step {index} ({step}) timed out after {ms}ms waiting for {condition}")]
    StepTimeout {
        /// Zero-based position of the step in the sequence
        index: usize,
        /// Short description of the step
        step: String,
        /// The condition that never held
        condition: String,
        /// Budget in milliseconds
        ms: u64,
    },

    /// An explicit structural assertion did not hold
    #[error("Assertion failed at step {index} ({checkpoint}): {message}")]
    AssertionFailure {
        /// Zero-based position of the step in the sequence
        index: usize,
        /// Checkpoint or step description
        checkpoint: String,
        /// Error message
        message: String,
    },

    /// Raw poll timeout, before it is attributed to a step
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waited_for: String,
    },

    /// Screenshot capture or decoding failed
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Page-level automation error (evaluation, input)
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Scenario or option validation failed
    #[error("Invalid configuration: {message}")]
    Config {
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

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PopshotError {
    /// Create a launch error
    #[must_use]
    pub fn launch(message: impl Into<String>) -> Self {
        Self::Launch {
            message: message.into(),
        }
    }

    /// Create an identity resolution error
    #[must_use]
    pub fn identity(message: impl Into<String>) -> Self {
        Self::IdentityResolution {
            message: message.into(),
        }
    }

    /// Create a navigation error
    #[must_use]
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a screenshot error
    #[must_use]
    pub fn screenshot(message: impl Into<String>) -> Self {
        Self::Screenshot {
            message: message.into(),
        }
    }

    /// Whether this error came from a wait condition running out of time
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::StepTimeout { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_timeout_names_index_and_condition() {
        let err = PopshotError::StepTimeout {
            index: 3,
            step: "wait_for_text #output".to_string(),
            condition: "text contains 'Recent activity'".to_string(),
            ms: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("Step 3"));
        assert!(msg.contains("Recent activity"));
        assert!(msg.contains("10000ms"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_assertion_failure_names_checkpoint() {
        let err = PopshotError::AssertionFailure {
            index: 5,
            checkpoint: "expanded".to_string(),
            message: "label was 'x'".to_string(),
        };
        assert!(err.to_string().contains("expanded"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_constructors() {
        assert!(PopshotError::launch("no chrome")
            .to_string()
            .contains("launch"));
        assert!(PopshotError::identity("no worker")
            .to_string()
            .contains("identity"));
        let nav = PopshotError::navigation("file:///x.html", "net::ERR_FILE_NOT_FOUND");
        assert!(nav.to_string().contains("file:///x.html"));
        assert!(PopshotError::config("bad").to_string().contains("configuration"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PopshotError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
