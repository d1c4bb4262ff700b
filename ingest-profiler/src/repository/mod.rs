//! Persistence for analysis results and file records.
//!
//! The orchestrator writes results through [`AnalysisRepository`] and file
//! metadata through [`FileRepository`]. Background submissions are polled by
//! reading the same repository.

use async_trait::async_trait;

use crate::core::{AnalysisResult, FileRecord};
use crate::error::Result;

pub mod in_memory;

pub use in_memory::InMemoryRepository;

/// Storage backend for [`AnalysisResult`] records.
///
/// # Example
///
/// ```rust
/// use ingest_profiler::core::AnalysisResult;
/// use ingest_profiler::repository::{AnalysisRepository, InMemoryRepository};
///
/// # #[tokio::main]
/// # async fn main() {
/// let repository = InMemoryRepository::new();
/// let result = AnalysisResult::pending("analysis_1", "file_1", "user_1", "people.csv");
/// repository.save_analysis(&result).await.unwrap();
///
/// let loaded = repository.get_analysis("analysis_1").await.unwrap();
/// assert_eq!(loaded, Some(result));
/// # }
/// ```
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// Inserts or replaces the result keyed by its `analysis_id`.
    async fn save_analysis(&self, result: &AnalysisResult) -> Result<()>;

    async fn get_analysis(&self, analysis_id: &str) -> Result<Option<AnalysisResult>>;

    /// All analyses for a user, newest first.
    async fn list_analyses(&self, user_id: &str) -> Result<Vec<AnalysisResult>>;

    /// Returns whether a record was removed.
    async fn delete_analysis(&self, analysis_id: &str) -> Result<bool>;
}

/// Storage backend for [`FileRecord`] metadata.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn save_file(&self, record: &FileRecord) -> Result<()>;

    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>>;

    /// All files for a user, newest first.
    async fn list_files(&self, user_id: &str) -> Result<Vec<FileRecord>>;

    async fn delete_file(&self, file_id: &str) -> Result<bool>;
}
