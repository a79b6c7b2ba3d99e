//! Error types for workflow construction and execution
//!
//! Model failures are the transient class and get retried by the task loop.
//! Everything else surfaces immediately.

use crate::model::ModelError;
use thiserror::Error;

/// Workflow-level error types
///
/// All errors that can escape `Workflow::initiate`, agent construction or
/// definition loading are represented by this enum.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Required configuration is missing or invalid (e.g. no API key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A task exhausted its attempt budget
    ///
    /// The original model failure is kept as the error source.
    #[error("Task '{task_id}' failed after {attempts} attempts: {source}")]
    TaskFailed {
        /// ID of the task that failed
        task_id: String,
        /// Number of attempts made
        attempts: u32,
        /// Failure raised by the last attempt
        #[source]
        source: ModelError,
    },

    /// The run ended without reaching a final task (empty task list)
    #[error("Workflow did not complete")]
    DidNotComplete,

    /// Workflow structure is invalid (unknown references, duplicate ids)
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// Workflow definition file could not be interpreted
    #[error("Invalid workflow definition: {0}")]
    Definition(String),

    /// Filesystem error while reading definitions or inputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error while reading definitions or inputs
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Returns the underlying model error for terminal task failures
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            WorkflowError::TaskFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_task_failed_message_includes_cause() {
        let err = WorkflowError::TaskFailed {
            task_id: "research".to_string(),
            attempts: 3,
            source: ModelError::Request("connection reset".to_string()),
        };

        let msg = err.to_string();
        assert!(msg.contains("research"));
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("connection reset"));
        assert!(err.source().is_some());
        assert!(err.model_error().is_some());
    }

    #[test]
    fn test_did_not_complete_is_distinct() {
        let err = WorkflowError::DidNotComplete;
        assert_eq!(err.to_string(), "Workflow did not complete");
        assert!(err.model_error().is_none());
    }
}
