use thiserror::Error;

use crate::error::ProfilerError;

/// Errors that can occur when talking to the LLM service.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Authentication failed (invalid or expired API key).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Network error (connection refused, reset, client-side timeout).
    #[error("Network error: {message}")]
    Network { message: String },

    /// Rate limited by the server.
    #[error("Rate limited. Retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Server returned an error status.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Request validation failed.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The body could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// HTTP succeeded but the payload reports a failure.
    #[error("LLM service reported failure: {message}")]
    Service { message: String },

    /// Client configuration error.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl LlmError {
    /// Returns true if this error is transient and the call should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Network { .. } => true,
            LlmError::RateLimited { .. } => true,
            LlmError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the suggested retry delay in seconds, if available.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}

impl From<LlmError> for ProfilerError {
    fn from(err: LlmError) -> Self {
        ProfilerError::Llm {
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// Result type for LLM operations.
pub type LlmResult<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_is_retryable() {
        assert!(!LlmError::Authentication {
            message: "bad key".to_string()
        }
        .is_retryable());
        assert!(LlmError::Network {
            message: "connection refused".to_string()
        }
        .is_retryable());
        assert!(LlmError::ServerError {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!LlmError::ServerError {
            status: 404,
            message: "no route".to_string()
        }
        .is_retryable());
        assert!(!LlmError::Service {
            message: "model not loaded".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_conversion_keeps_retryability() {
        let err: ProfilerError = LlmError::RateLimited {
            retry_after_secs: Some(3),
        }
        .into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Rate limited"));
    }
}
