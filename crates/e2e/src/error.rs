//! Error types for the harness

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Assertion failed: {subject}: expected {expected}, got {actual}")]
    AssertionFailed {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("Timed out after {waited_ms} ms waiting for {subject} (expected {expected}); value never appeared")]
    SettleTimeout {
        subject: String,
        expected: String,
        waited_ms: u64,
    },

    #[error("Malformed persisted state under '{key}': {reason}")]
    MalformedState { key: String, reason: String },

    #[error("Driver action '{action}' failed: {reason}")]
    Driver { action: String, reason: String },

    #[error("Element not found for '{action}': {selector}")]
    ElementNotFound { action: String, selector: String },

    #[error("Subject unreachable: {0}")]
    SubjectUnreachable(String),

    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright bridge error: {0}")]
    Bridge(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Coarse failure category recorded in scenario reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Value observed, but not the expected one
    Assertion,
    /// Awaited value never became observable
    SettleTimeout,
    /// The subject wrote a blob we cannot parse
    MalformedState,
    /// Browser, page or environment problem
    Driver,
    /// Problem in the harness inputs (scenario file, config)
    Harness,
}

impl HarnessError {
    pub fn kind(&self) -> FailureKind {
        match self {
            HarnessError::AssertionFailed { .. } => FailureKind::Assertion,
            HarnessError::SettleTimeout { .. } => FailureKind::SettleTimeout,
            HarnessError::MalformedState { .. } => FailureKind::MalformedState,
            HarnessError::Driver { .. }
            | HarnessError::ElementNotFound { .. }
            | HarnessError::SubjectUnreachable(_)
            | HarnessError::PlaywrightNotFound
            | HarnessError::Bridge(_)
            | HarnessError::Io(_)
            | HarnessError::Http(_) => FailureKind::Driver,
            HarnessError::ScenarioParse(_)
            | HarnessError::InvalidTarget(_)
            | HarnessError::Config(_)
            | HarnessError::Json(_)
            | HarnessError::Yaml(_)
            | HarnessError::Toml(_) => FailureKind::Harness,
        }
    }

    /// Expected/actual pair, when the error carries one.
    pub fn expected_actual(&self) -> (Option<String>, Option<String>) {
        match self {
            HarnessError::AssertionFailed { expected, actual, .. } => {
                (Some(expected.clone()), Some(actual.clone()))
            }
            HarnessError::SettleTimeout { expected, .. } => (Some(expected.clone()), None),
            _ => (None, None),
        }
    }

    pub(crate) fn driver(action: impl Into<String>, reason: impl Into<String>) -> Self {
        HarnessError::Driver {
            action: action.into(),
            reason: reason.into(),
        }
    }
}
