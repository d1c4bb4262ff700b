//! Analysis pipeline tests with real repositories, a filesystem object store
//! and the background queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ingest_profiler::config::PipelineConfig;
use ingest_profiler::core::{AnalysisStatus, DdlSource, FileStatus, StorageSystem};
use ingest_profiler::llm::{LlmBackend, LlmError, LlmRequest, LlmResponse, LlmResult};
use ingest_profiler::pipeline::{AnalysisQueue, AnalysisRequest, AnalysisRunner};
use ingest_profiler::repository::{AnalysisRepository, FileRepository, InMemoryRepository};
use tokio::sync::watch;

const PEOPLE: &str = "name;age\nJohn;30\nJane;25";

struct UnavailableLlm;

#[async_trait]
impl LlmBackend for UnavailableLlm {
    async fn complete(&self, _request: &LlmRequest) -> LlmResult<LlmResponse> {
        Err(LlmError::ServerError {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }
}

fn config() -> PipelineConfig {
    PipelineConfig::default().with_retry_base_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_unavailable_llm_still_completes() {
    let repository = Arc::new(InMemoryRepository::new());
    let runner = AnalysisRunner::new(config())
        .with_llm(Arc::new(UnavailableLlm))
        .with_analysis_repository(repository.clone());

    let result = runner
        .run(AnalysisRequest::from_bytes("user_1", "people.csv", PEOPLE))
        .await;

    assert_eq!(result.status, AnalysisStatus::Completed);
    assert!(result.llm_analysis.is_none());
    assert!(result.llm_recommendations.is_empty());
    assert_eq!(result.ddl_source, Some(DdlSource::Fallback));
    assert!(result.completed_at.is_some());
    assert_eq!(
        result.storage_recommendation.as_ref().unwrap().primary_storage,
        StorageSystem::PostgreSQL
    );

    let stored = repository
        .get_analysis(&result.analysis_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, result);
}

#[tokio::test]
async fn test_results_are_listed_per_user() {
    let repository = Arc::new(InMemoryRepository::new());
    let runner = AnalysisRunner::new(config()).with_analysis_repository(repository.clone());

    runner
        .run(AnalysisRequest::from_bytes("alice", "a.csv", PEOPLE))
        .await;
    runner
        .run(AnalysisRequest::from_bytes("alice", "b.json", "{\"id\": 1}"))
        .await;
    runner
        .run(AnalysisRequest::from_bytes("bob", "c.csv", PEOPLE))
        .await;

    let alice = repository.list_analyses("alice").await.unwrap();
    assert_eq!(alice.len(), 2);
    assert!(alice.iter().all(|r| r.user_id == "alice"));
    assert_eq!(repository.list_analyses("bob").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_profile_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.csv");
    tokio::fs::write(&path, "order_id;created_at;total\n1;2024-01-01;10.5\n2;2024-01-02;")
        .await
        .unwrap();

    let result = AnalysisRunner::new(config())
        .run(AnalysisRequest::from_path("user_1", &path))
        .await;

    assert_eq!(result.status, AnalysisStatus::Completed);
    assert_eq!(result.file_name, "orders.csv");
    let profile = result.data_profile.as_ref().unwrap();
    assert_eq!(profile.total_rows, 2);
    assert!(profile.data_quality_score < 1.0);

    let schema = result.table_schema.as_ref().unwrap();
    assert_eq!(schema.indexed_fields(), vec!["order_id", "created_at"]);
    assert!(result.ddl_script.as_deref().unwrap().contains("CREATE TABLE"));
}

#[cfg(feature = "cloud-storage")]
#[tokio::test]
async fn test_upload_mirrored_to_local_store() {
    use ingest_profiler::store::{ObjectStorage, ObjectStoreBackend};

    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(ObjectStoreBackend::local(dir.path()));
    let repository = Arc::new(InMemoryRepository::new());
    let runner = AnalysisRunner::new(config().with_bucket("uploads"))
        .with_storage(storage.clone())
        .with_analysis_repository(repository.clone())
        .with_file_repository(repository.clone());

    let result = runner
        .run(AnalysisRequest::from_bytes("user_1", "people.csv", PEOPLE))
        .await;
    assert_eq!(result.status, AnalysisStatus::Completed);

    let files = repository.list_files("user_1").await.unwrap();
    assert_eq!(files.len(), 1);
    let record = &files[0];
    assert_eq!(record.id, result.file_id);
    assert_eq!(record.bucket, "uploads");
    assert_eq!(record.status, FileStatus::Processed);
    assert_eq!(record.size, PEOPLE.len() as u64);

    let stored = storage.get("uploads", &record.storage_path).await.unwrap();
    assert_eq!(stored, PEOPLE.as_bytes());
    assert!(dir.path().join("uploads").is_dir());
}

#[tokio::test]
async fn test_background_queue_end_to_end() {
    let repository = Arc::new(InMemoryRepository::new());
    let runner = Arc::new(
        AnalysisRunner::new(config().with_max_concurrency(2))
            .with_analysis_repository(repository.clone()),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (queue, worker) = AnalysisQueue::spawn(runner, repository.clone(), shutdown_rx);

    let good = queue
        .submit(AnalysisRequest::from_bytes("user_1", "people.csv", PEOPLE))
        .await
        .unwrap();
    let bad = queue
        .submit(AnalysisRequest::from_bytes("user_1", "broken.json", "{not json"))
        .await
        .unwrap();
    assert_eq!(good.status, AnalysisStatus::Pending);

    let interval = Duration::from_millis(5);
    let deadline = Duration::from_secs(5);
    let good = queue
        .wait(&good.analysis_id, interval, deadline)
        .await
        .unwrap();
    let bad = queue
        .wait(&bad.analysis_id, interval, deadline)
        .await
        .unwrap();
    assert_eq!(good.status, AnalysisStatus::Completed);
    assert_eq!(bad.status, AnalysisStatus::Failed);
    assert!(bad.error.as_deref().unwrap().contains("json"));

    shutdown_tx.send(true).unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("worker should stop")
        .unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.panicked, 0);
}
