//! Validation verdict value object.

use serde::{Deserialize, Serialize};

/// Which layer of checking produced a result. The chain's short-circuit rule
/// keys on `Syntax`: a syntactically broken message makes every later layer's
/// output noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Syntax,
    Semantic,
    Business,
    Timing,
}

/// Immutable outcome of one validator over one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
    pub severity: Severity,
    /// One line per individual finding, in the order they were discovered.
    pub details: Vec<String>,
}

impl ValidationResult {
    pub fn pass(severity: Severity) -> Self {
        Self {
            valid: true,
            message: "validation passed".to_string(),
            severity,
            details: Vec::new(),
        }
    }

    pub fn fail(severity: Severity, message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            severity,
            details,
        }
    }

    /// `pass` when `details` is empty, `fail` otherwise. Validators that
    /// accumulate findings into a list end with this.
    pub fn from_details(
        severity: Severity,
        failure_message: impl Into<String>,
        details: Vec<String>,
    ) -> Self {
        if details.is_empty() {
            Self::pass(severity)
        } else {
            Self::fail(severity, failure_message, details)
        }
    }
}
