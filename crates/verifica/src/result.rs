//! Result and error types for Verifica.

use serde::Serialize;
use thiserror::Error;

/// Result type for Verifica operations
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Stable classification of a [`VerifyError`], used by reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Neither location strategy found a landmark
    PresenceNotFound,
    /// Wrong element focused at a checkpoint
    FocusMismatch,
    /// Class predicate false after toggling
    ToggleStateMismatch,
    /// Phase attempted without required prior state
    WorkflowPreconditionUnmet,
    /// Phase ran but its assertion was false
    WorkflowPostconditionFailed,
    /// A driver suspension point exceeded its bound
    DriverTimeout,
    /// Element lookup failed
    ElementNotFound,
    /// Any other driver or infrastructure failure
    Infrastructure,
    /// Invalid caller input (plans, configuration)
    Usage,
}

impl ErrorKind {
    /// Get the kind as a static string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PresenceNotFound => "presence_not_found",
            Self::FocusMismatch => "focus_mismatch",
            Self::ToggleStateMismatch => "toggle_state_mismatch",
            Self::WorkflowPreconditionUnmet => "workflow_precondition_unmet",
            Self::WorkflowPostconditionFailed => "workflow_postcondition_failed",
            Self::DriverTimeout => "driver_timeout",
            Self::ElementNotFound => "element_not_found",
            Self::Infrastructure => "infrastructure",
            Self::Usage => "usage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while verifying a page
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Landmark not found by any strategy
    #[error("Landmark '{landmark}' not found: strategies [{}] all matched zero elements", .strategies.join(", "))]
    PresenceNotFound {
        /// Landmark name
        landmark: String,
        /// Strategies that were attempted
        strategies: Vec<String>,
    },

    /// Focus was not on the expected target
    #[error("Focus mismatch at checkpoint {index} ('{target}'): focused element was {actual}")]
    FocusMismatch {
        /// Checkpoint index
        index: usize,
        /// Expected target name
        target: String,
        /// Description of what was focused
        actual: String,
    },

    /// Theme toggle did not produce the expected class
    #[error("Toggle state mismatch: expected {expected}, observed {observed}")]
    ToggleStateMismatch {
        /// Expected class pattern
        expected: String,
        /// Observed class string
        observed: String,
    },

    /// Workflow phase attempted without required state
    #[error("Workflow precondition unmet: phase '{phase}' requires [{}]", .missing.join(", "))]
    WorkflowPreconditionUnmet {
        /// Phase name
        phase: String,
        /// Missing state keys
        missing: Vec<String>,
    },

    /// Workflow phase assertion failed
    #[error("Workflow postcondition failed in phase '{phase}': expected {expected}, got {actual}")]
    WorkflowPostconditionFailed {
        /// Phase name
        phase: String,
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Driver operation timed out
    #[error("Driver timeout: {operation} exceeded {ms}ms")]
    DriverTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Element not found
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector description
        selector: String,
    },

    /// Driver error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Invalid focus plan or workflow chain
    #[error("Invalid plan: {message}")]
    InvalidPlan {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
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
}

impl VerifyError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PresenceNotFound { .. } => ErrorKind::PresenceNotFound,
            Self::FocusMismatch { .. } => ErrorKind::FocusMismatch,
            Self::ToggleStateMismatch { .. } => ErrorKind::ToggleStateMismatch,
            Self::WorkflowPreconditionUnmet { .. } => ErrorKind::WorkflowPreconditionUnmet,
            Self::WorkflowPostconditionFailed { .. } => ErrorKind::WorkflowPostconditionFailed,
            Self::DriverTimeout { .. } => ErrorKind::DriverTimeout,
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::InvalidPlan { .. } | Self::Config { .. } | Self::Yaml(_) => ErrorKind::Usage,
            Self::Driver { .. }
            | Self::BrowserLaunch { .. }
            | Self::Navigation { .. }
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Infrastructure,
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, ms: u64) -> Self {
        Self::DriverTimeout {
            operation: operation.into(),
            ms,
        }
    }

    /// Create a postcondition failure
    #[must_use]
    pub fn postcondition(
        phase: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::WorkflowPostconditionFailed {
            phase: phase.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid plan error
    #[must_use]
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan {
            message: message.into(),
        }
    }
}
