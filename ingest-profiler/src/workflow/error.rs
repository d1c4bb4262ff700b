use thiserror::Error;

use crate::error::ProfilerError;

/// Errors that can occur when triggering or polling workflow runs.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Authentication failed (wrong user or password).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Network error (connection failed, timeout, etc.).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The DAG or run does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// A run with the same id already exists.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Server returned an error.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl WorkflowError {
    /// Returns true if this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::Network { .. } => true,
            WorkflowError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<WorkflowError> for ProfilerError {
    fn from(err: WorkflowError) -> Self {
        ProfilerError::Workflow {
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_is_retryable() {
        assert!(WorkflowError::Network {
            message: "refused".to_string()
        }
        .is_retryable());
        assert!(!WorkflowError::NotFound {
            message: "dag".to_string()
        }
        .is_retryable());
        let err: ProfilerError = WorkflowError::ServerError {
            status: 502,
            message: "bad gateway".to_string(),
        }
        .into();
        assert!(err.is_retryable());
    }
}
