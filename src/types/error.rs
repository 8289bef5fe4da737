//! Unified Error Type System
//!
//! Centralized error types for the whole engine.
//!
//! ## Propagation policy
//!
//! - Suite-resolution errors (`SuiteNotFound`, `SuiteDisabled`,
//!   `SuiteAlreadyRunning`) are the only hard errors surfaced to a suite-run
//!   caller.
//! - An agent erroring past its contract is absorbed by the orchestrator into
//!   a synthetic `RunResult` with one critical finding.
//! - A failure inside a single check/journey/scenario is absorbed by the
//!   owning agent into one finding; sibling checks keep running.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatrolError {
    // -------------------------------------------------------------------------
    // Suite resolution (surfaced to the run caller, suite not started)
    // -------------------------------------------------------------------------
    #[error("Suite not found: {0}")]
    SuiteNotFound(String),

    #[error("Suite is disabled: {0}")]
    SuiteDisabled(String),

    #[error("Suite is already running: {0}")]
    SuiteAlreadyRunning(String),

    // -------------------------------------------------------------------------
    // Collaborator errors (absorbed into findings at the agent boundary)
    // -------------------------------------------------------------------------
    #[error("Record store error: {0}")]
    Store(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    // -------------------------------------------------------------------------
    // System errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

pub type Result<T> = std::result::Result<T, PatrolError>;

impl PatrolError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a record store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// True for the errors a `run(suite_id)` caller sees directly.
    pub fn is_suite_resolution(&self) -> bool {
        matches!(
            self,
            Self::SuiteNotFound(_) | Self::SuiteDisabled(_) | Self::SuiteAlreadyRunning(_)
        )
    }
}

/// Context extension trait for adding context to collaborator errors
pub trait ResultExt<T> {
    /// Wrap any error as a store error with a context prefix
    fn store_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn store_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| PatrolError::Store(format!("{}: {}", context.into(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_resolution_classification() {
        assert!(PatrolError::SuiteNotFound("x".into()).is_suite_resolution());
        assert!(PatrolError::SuiteDisabled("x".into()).is_suite_resolution());
        assert!(PatrolError::SuiteAlreadyRunning("x".into()).is_suite_resolution());
        assert!(!PatrolError::Store("x".into()).is_suite_resolution());
        assert!(!PatrolError::llm("x").is_suite_resolution());
    }

    #[test]
    fn timeout_display() {
        let err = PatrolError::timeout("load scenario", Duration::from_secs(30));
        let msg = err.to_string();
        assert!(msg.contains("load scenario"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn store_context_wraps_error() {
        let inner: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing table",
        ));
        let err = inner.store_context("fixture insert").unwrap_err();
        assert!(matches!(err, PatrolError::Store(_)));
        assert!(err.to_string().contains("fixture insert"));
    }
}
