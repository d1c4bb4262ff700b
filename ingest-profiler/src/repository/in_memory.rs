//! In-memory implementation of the repositories for testing and development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use super::{AnalysisRepository, FileRepository};
use crate::core::{AnalysisResult, FileRecord};
use crate::error::Result;

/// Stores analyses and file records in shared maps.
///
/// Clones share the same storage, so one instance can be handed to the
/// runner, the background worker and the polling caller.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    analyses: Arc<RwLock<HashMap<String, AnalysisResult>>>,
    files: Arc<RwLock<HashMap<String, FileRecord>>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored analyses.
    pub async fn analysis_count(&self) -> usize {
        self.analyses.read().await.len()
    }

    /// Returns the number of stored file records.
    pub async fn file_count(&self) -> usize {
        self.files.read().await.len()
    }

    /// Clears all stored records.
    pub async fn clear(&self) {
        self.analyses.write().await.clear();
        self.files.write().await.clear();
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryRepository {
    #[instrument(skip(self, result), fields(analysis_id = %result.analysis_id, status = %result.status, repository_type = "in_memory"))]
    async fn save_analysis(&self, result: &AnalysisResult) -> Result<()> {
        self.analyses
            .write()
            .await
            .insert(result.analysis_id.clone(), result.clone());
        Ok(())
    }

    async fn get_analysis(&self, analysis_id: &str) -> Result<Option<AnalysisResult>> {
        Ok(self.analyses.read().await.get(analysis_id).cloned())
    }

    async fn list_analyses(&self, user_id: &str) -> Result<Vec<AnalysisResult>> {
        let mut results: Vec<AnalysisResult> = self
            .analyses
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.analysis_id.cmp(&a.analysis_id))
        });
        Ok(results)
    }

    async fn delete_analysis(&self, analysis_id: &str) -> Result<bool> {
        Ok(self.analyses.write().await.remove(analysis_id).is_some())
    }
}

#[async_trait]
impl FileRepository for InMemoryRepository {
    #[instrument(skip(self, record), fields(file_id = %record.id, repository_type = "in_memory"))]
    async fn save_file(&self, record: &FileRecord) -> Result<()> {
        self.files
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>> {
        Ok(self.files.read().await.get(file_id).cloned())
    }

    async fn list_files(&self, user_id: &str) -> Result<Vec<FileRecord>> {
        let mut records: Vec<FileRecord> = self
            .files
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn delete_file(&self, file_id: &str) -> Result<bool> {
        Ok(self.files.write().await.remove(file_id).is_some())
    }
}
