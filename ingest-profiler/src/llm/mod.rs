//! LLM enrichment capability.
//!
//! The orchestrator talks to the language model through [`LlmBackend`]. The
//! wire types mirror the LLM service contract: a request carries the user
//! query, source and target descriptions, the operation type and optionally
//! the profile; a response carries the generated text, a status and an
//! optional error that must be honoured even on HTTP 200.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::DataProfile;

#[cfg(feature = "llm")]
mod client;
mod error;
mod extract;
pub mod prompts;

#[cfg(feature = "llm")]
pub use client::{HttpLlmClient, LlmClientConfig};
pub use error::{LlmError, LlmResult};
pub use extract::{extract_recommendations, strip_code_fences, LLM_PREFIX};

/// What the LLM is asked to do. Drives the request timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    DataAnalysis,
    DdlGeneration,
    FileAnalysis,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataAnalysis => "data_analysis",
            Self::DdlGeneration => "ddl_generation",
            Self::FileAnalysis => "file_analysis",
        }
    }

    /// DDL generation and whole-file analysis get the long timeout.
    pub fn is_long_running(&self) -> bool {
        !matches!(self, Self::DataAnalysis)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes the data being analysed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

/// Describes what the LLM output is for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub user_query: String,
    pub source_config: SourceConfig,
    pub target_config: TargetConfig,
    pub operation_type: OperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_profile: Option<DataProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// The `error` member comes back either as a plain string or as an object
/// with a `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseError {
    Text(String),
    Detailed {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl ResponseError {
    pub fn message(&self) -> &str {
        match self {
            Self::Text(message) | Self::Detailed { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(default, alias = "message")]
    pub content: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl LlmResponse {
    /// Returns the generated text, or an error when the payload reports one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingest_profiler::llm::LlmResponse;
    ///
    /// let ok: LlmResponse = serde_json::from_str(r#"{"message": "looks good", "status": "success"}"#).unwrap();
    /// assert_eq!(ok.into_content().unwrap(), "looks good");
    ///
    /// let failed: LlmResponse = serde_json::from_str(r#"{"content": "", "status": "ok", "error": "model offline"}"#).unwrap();
    /// assert!(failed.into_content().is_err());
    /// ```
    pub fn into_content(self) -> LlmResult<String> {
        if let Some(error) = self.error.as_ref().filter(|e| !e.message().trim().is_empty()) {
            return Err(LlmError::Service {
                message: error.message().to_string(),
            });
        }
        if self.status.eq_ignore_ascii_case("error") || self.status.eq_ignore_ascii_case("failed")
        {
            return Err(LlmError::Service {
                message: format!("status '{}'", self.status),
            });
        }
        Ok(self.content)
    }
}

/// A language model reachable by the orchestrator.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> LlmResult<LlmResponse>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str {
        "llm"
    }
}
