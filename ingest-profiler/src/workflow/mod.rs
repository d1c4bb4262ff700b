//! Downstream workflow trigger capability.
//!
//! After a completed analysis the orchestrator can start a pipeline run
//! (an Airflow DAG run) that loads the file into the recommended storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analyzers::inference::DEFAULT_SAMPLE_SIZE;
use crate::core::AnalysisResult;

#[cfg(feature = "airflow")]
mod airflow;
mod error;

#[cfg(feature = "airflow")]
pub use airflow::{AirflowClient, AirflowConfig, ComponentHealth, HealthResponse};
pub use error::{WorkflowError, WorkflowResult};

/// Input parameters passed as the DAG run `conf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagRunConf {
    pub file_id: String,
    pub user_id: String,
    pub file_path: String,
    pub file_format: String,
    pub sample_size: usize,
    pub analysis_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

impl DagRunConf {
    /// Builds the run parameters for a finished analysis.
    ///
    /// `file_path` is the object key the upload was mirrored to, or the file
    /// name when mirroring did not happen.
    pub fn for_analysis(result: &AnalysisResult, file_path: impl Into<String>) -> Self {
        Self {
            file_id: result.file_id.clone(),
            user_id: result.user_id.clone(),
            file_path: file_path.into(),
            file_format: result
                .data_profile
                .as_ref()
                .map(|p| p.data_type.as_str().to_string())
                .unwrap_or_default(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            analysis_type: "full".to_string(),
            primary_storage: result
                .storage_recommendation
                .as_ref()
                .map(|s| s.primary_storage.as_str().to_string()),
            table_name: result.table_schema.as_ref().map(|s| s.table_name.clone()),
            row_count: result.data_profile.as_ref().map(|p| p.total_rows),
        }
    }
}

/// State of one task inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Snapshot of a DAG run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagRunStatus {
    pub dag_id: String,
    pub run_id: String,
    pub state: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskState>,
}

impl DagRunStatus {
    /// `success` and `failed` are the only final run states.
    pub fn is_finished(&self) -> bool {
        matches!(self.state.as_str(), "success" | "failed")
    }
}

/// Starts and inspects workflow runs.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Starts a run and returns its id.
    async fn trigger(&self, dag_id: &str, conf: &DagRunConf) -> WorkflowResult<String>;

    async fn status(&self, dag_id: &str, run_id: &str) -> WorkflowResult<DagRunStatus>;
}
