//! Outcome of releasing layer resources
//!
//! Cleanup never fails as a whole: each layer is released independently and
//! the failures are collected for the caller to log or report.

use serde::Serialize;

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "errors", rename_all = "snake_case")]
pub enum CleanupResult {
    /// All cleanup operations succeeded
    Success,
    /// Some cleanup operations failed, with error details
    PartialFailure(Vec<String>),
}

impl CleanupResult {
    /// Build from collected error messages
    #[must_use]
    pub fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Success
        } else {
            Self::PartialFailure(errors)
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Success => &[],
            Self::PartialFailure(errors) => errors,
        }
    }
}
