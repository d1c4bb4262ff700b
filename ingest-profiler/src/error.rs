//! Error types for the ingest profiler.
//!
//! All fallible operations in the crate return [`ProfilerError`]. Adapters for
//! external systems (LLM, workflow trigger) keep their own narrower error enums
//! and convert into this one at the orchestrator boundary.

use std::time::Duration;

use thiserror::Error;

use crate::core::DataFormat;

/// The main error type for the ingest profiler.
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// The input contained no records at all.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// The input could not be parsed in the expected format.
    #[error("Parse error ({format}): {message}")]
    Parse {
        /// Format the parser was reading
        format: DataFormat,
        /// Detailed error message
        message: String,
    },

    /// The file type could not be detected and no fallback was supplied.
    #[error("Unsupported file type for '{filename}'")]
    UnsupportedFormat { filename: String },

    /// Error from the object store capability.
    #[error("Object store error during {operation}: {message}")]
    ObjectStore {
        /// Name of the failed operation (put, get, ...)
        operation: String,
        /// Detailed error message
        message: String,
    },

    /// Error from the LLM capability.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        /// Whether the call may succeed if repeated
        retryable: bool,
    },

    /// Error from the workflow trigger capability.
    #[error("Workflow error: {message}")]
    Workflow { message: String, retryable: bool },

    /// An external call exceeded its deadline.
    #[error("Operation '{operation}' timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// A terminal analysis result was asked to change state.
    #[error("Invalid state transition for analysis '{analysis_id}': {from} -> {to}")]
    InvalidTransition {
        analysis_id: String,
        from: String,
        to: String,
    },

    /// A requested record does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    Security(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ProfilerError>`.
pub type Result<T> = std::result::Result<T, ProfilerError>;

impl ProfilerError {
    /// Creates a new parse error for the given format.
    pub fn parse(format: DataFormat, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Creates a new object store error.
    pub fn object_store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ObjectStore {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Creates a new not-found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Returns true for errors caused by the uploaded content itself.
    ///
    /// Input errors abort an analysis and map to a 4xx-style response.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput(_) | Self::Parse { .. } | Self::UnsupportedFormat { .. }
        )
    }

    /// Returns true if this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Llm { retryable, .. } | Self::Workflow { retryable, .. } => *retryable,
            Self::ObjectStore { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ProfilerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ProfilerError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            ProfilerError::Internal(inner) => ProfilerError::Internal(format!("{msg}: {inner}")),
            other => ProfilerError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                ProfilerError::Internal(inner) => {
                    ProfilerError::Internal(format!("{msg}: {inner}"))
                }
                other => ProfilerError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
