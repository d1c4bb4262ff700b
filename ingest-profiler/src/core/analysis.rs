//! Analysis lifecycle and the records persisted per upload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DataProfile, DdlMetadata, Recommendation, StorageRecommendation, TableSchema};
use crate::error::{ProfilerError, Result};

/// State of an analysis run.
///
/// `Completed` and `Failed` are absorbing: once reached, the result is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced `AnalysisResult::ddl_script`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DdlSource {
    Llm,
    Fallback,
}

/// Top-level aggregate persisted and returned per analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub file_id: String,
    pub user_id: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_profile: Option<DataProfile>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_recommendation: Option<StorageRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_schema: Option<TableSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddl_metadata: Option<DdlMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_analysis: Option<String>,
    #[serde(default)]
    pub llm_recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddl_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddl_source: Option<DdlSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_run_id: Option<String>,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Creates a new result in the `pending` state.
    pub fn pending(
        analysis_id: impl Into<String>,
        file_id: impl Into<String>,
        user_id: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            file_id: file_id.into(),
            user_id: user_id.into(),
            file_name: file_name.into(),
            data_profile: None,
            recommendations: Vec::new(),
            storage_recommendation: None,
            table_schema: None,
            ddl_metadata: None,
            adjusted_quality_score: None,
            llm_analysis: None,
            llm_recommendations: Vec::new(),
            ddl_script: None,
            ddl_source: None,
            workflow_run_id: None,
            status: AnalysisStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `pending -> running`. Re-entering `running` is a no-op.
    pub fn mark_running(&mut self) -> Result<()> {
        match self.status {
            AnalysisStatus::Pending | AnalysisStatus::Running => {
                self.status = AnalysisStatus::Running;
                Ok(())
            }
            _ => Err(self.transition_error(AnalysisStatus::Running)),
        }
    }

    /// Embeds the profile and everything derived from it.
    pub fn attach_profile(
        &mut self,
        profile: DataProfile,
        recommendation: Recommendation,
        adjusted_quality_score: f64,
    ) -> Result<()> {
        self.ensure_mutable()?;
        self.data_profile = Some(profile);
        self.recommendations = recommendation.recommendations;
        self.storage_recommendation = Some(recommendation.storage);
        self.table_schema = Some(recommendation.schema);
        self.ddl_metadata = Some(recommendation.ddl_metadata);
        self.adjusted_quality_score = Some(adjusted_quality_score);
        Ok(())
    }

    /// Attaches LLM enrichment. Empty text is treated as absent.
    pub fn attach_llm_analysis(
        &mut self,
        analysis: impl Into<String>,
        extracted: Vec<String>,
    ) -> Result<()> {
        self.ensure_mutable()?;
        let analysis = analysis.into();
        if !analysis.trim().is_empty() {
            self.llm_analysis = Some(analysis);
            self.llm_recommendations = extracted;
        }
        Ok(())
    }

    pub fn attach_ddl(&mut self, script: impl Into<String>, source: DdlSource) -> Result<()> {
        self.ensure_mutable()?;
        self.ddl_script = Some(script.into());
        self.ddl_source = Some(source);
        Ok(())
    }

    pub fn attach_workflow_run(&mut self, run_id: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.workflow_run_id = Some(run_id.into());
        Ok(())
    }

    /// `running -> completed`, stamping `completed_at`.
    pub fn complete(&mut self) -> Result<()> {
        if self.status != AnalysisStatus::Running {
            return Err(self.transition_error(AnalysisStatus::Completed));
        }
        self.status = AnalysisStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `pending | running -> failed`, recording the error message.
    pub fn fail(&mut self, error: impl fmt::Display) -> Result<()> {
        self.ensure_mutable()?;
        self.status = AnalysisStatus::Failed;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_terminal() {
            return Err(ProfilerError::InvalidTransition {
                analysis_id: self.analysis_id.clone(),
                from: self.status.to_string(),
                to: "modified".to_string(),
            });
        }
        Ok(())
    }

    fn transition_error(&self, to: AnalysisStatus) -> ProfilerError {
        ProfilerError::InvalidTransition {
            analysis_id: self.analysis_id.clone(),
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

/// Lifecycle of an uploaded file mirrored to the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploaded,
    Processing,
    Processed,
    Error,
    Deleted,
}

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub storage_path: String,
    pub bucket: String,
    /// Hex-encoded SHA-256 of the raw bytes.
    pub checksum: String,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn set_status(&mut self, status: FileStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
