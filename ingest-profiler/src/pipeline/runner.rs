use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use super::{AnalysisRequest, UploadSource};
use crate::analyzers::{QualityScorer, RecommendationEngine};
use crate::config::PipelineConfig;
use crate::core::{
    AnalysisResult, AnalysisStatus, DataFormat, DataProfile, DdlSource, FileRecord, FileStatus,
};
use crate::ddl;
use crate::error::{ProfilerError, Result};
use crate::ids::IdGenerator;
use crate::llm::{extract_recommendations, prompts, strip_code_fences, LlmBackend, LlmRequest};
use crate::repository::{AnalysisRepository, FileRepository};
use crate::sources::{detect_format, ParserSet};
use crate::store::{object_key, ObjectStorage, OCTET_STREAM};
use crate::workflow::{DagRunConf, WorkflowTrigger};

/// Runs analyses end to end.
///
/// Only parsing is mandatory. Every adapter is optional, and a failing
/// adapter downgrades the result instead of failing it.
///
/// # Examples
///
/// ```rust
/// use ingest_profiler::config::PipelineConfig;
/// use ingest_profiler::core::{AnalysisStatus, StorageSystem};
/// use ingest_profiler::pipeline::{AnalysisRequest, AnalysisRunner};
///
/// # #[tokio::main]
/// # async fn main() {
/// let runner = AnalysisRunner::new(PipelineConfig::default());
/// let request = AnalysisRequest::from_bytes("user_1", "people.csv", "name;age\nJohn;30\nJane;25");
///
/// let result = runner.run(request).await;
/// assert_eq!(result.status, AnalysisStatus::Completed);
/// assert_eq!(
///     result.storage_recommendation.unwrap().primary_storage,
///     StorageSystem::PostgreSQL
/// );
/// # }
/// ```
pub struct AnalysisRunner {
    config: PipelineConfig,
    parsers: ParserSet,
    engine: RecommendationEngine,
    scorer: QualityScorer,
    ids: IdGenerator,
    storage: Option<Arc<dyn ObjectStorage>>,
    llm: Option<Arc<dyn LlmBackend>>,
    workflow: Option<Arc<dyn WorkflowTrigger>>,
    analyses: Option<Arc<dyn AnalysisRepository>>,
    files: Option<Arc<dyn FileRepository>>,
}

impl AnalysisRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            engine: RecommendationEngine::new().with_table_name(config.table_name()),
            ids: IdGenerator::new(config.id_scheme()),
            parsers: ParserSet::new(),
            scorer: QualityScorer::new(),
            storage: None,
            llm: None,
            workflow: None,
            analyses: None,
            files: None,
            config,
        }
    }

    pub fn with_parsers(mut self, parsers: ParserSet) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_engine(mut self, engine: RecommendationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Mirror uploads to this object store.
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Enrich results and generate DDL with this model.
    pub fn with_llm(mut self, llm: Arc<dyn LlmBackend>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_workflow(mut self, workflow: Arc<dyn WorkflowTrigger>) -> Self {
        self.workflow = Some(workflow);
        self
    }

    /// Persist every state change of a run here.
    pub fn with_analysis_repository(mut self, repository: Arc<dyn AnalysisRepository>) -> Self {
        self.analyses = Some(repository);
        self
    }

    /// Record mirrored uploads here.
    pub fn with_file_repository(mut self, repository: Arc<dyn FileRepository>) -> Self {
        self.files = Some(repository);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mints ids and builds the `pending` result for a request.
    pub fn prepare(&self, request: &AnalysisRequest) -> AnalysisResult {
        AnalysisResult::pending(
            self.ids.analysis_id(),
            self.ids.file_id(),
            &request.user_id,
            &request.file_name,
        )
    }

    /// Analyses one upload and returns the terminal result.
    pub async fn run(&self, request: AnalysisRequest) -> AnalysisResult {
        let result = self.prepare(&request);
        self.execute(result, request).await
    }

    /// Drives an already prepared result to a terminal state.
    pub async fn execute(&self, result: AnalysisResult, request: AnalysisRequest) -> AnalysisResult {
        self.execute_with(result, request, self.analyses.as_deref())
            .await
    }

    #[instrument(skip_all, fields(analysis_id = %result.analysis_id, file_name = %result.file_name))]
    pub(crate) async fn execute_with(
        &self,
        mut result: AnalysisResult,
        request: AnalysisRequest,
        repository: Option<&dyn AnalysisRepository>,
    ) -> AnalysisResult {
        if let Err(e) = result.mark_running() {
            warn!(error = %e, "Refusing to run analysis");
            return result;
        }
        self.persist(repository, &result).await;

        let mut record = None;
        let outcome = match self.analyze(&mut result, request, &mut record).await {
            Ok(()) => result.complete(),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => info!(
                rows = result.data_profile.as_ref().map(|p| p.total_rows).unwrap_or_default(),
                llm_enriched = result.llm_analysis.is_some(),
                "Analysis completed"
            ),
            Err(e) => {
                error!(error = %e, input_error = e.is_input_error(), "Analysis failed");
                if let Err(transition) = result.fail(&e) {
                    warn!(error = %transition, "Could not record failure");
                }
            }
        }

        if let Some(mut record) = record {
            record.set_status(match result.status {
                AnalysisStatus::Completed => FileStatus::Processed,
                _ => FileStatus::Error,
            });
            self.save_file(&record).await;
        }
        self.persist(repository, &result).await;
        result
    }

    async fn analyze(
        &self,
        result: &mut AnalysisResult,
        request: AnalysisRequest,
        record: &mut Option<FileRecord>,
    ) -> Result<()> {
        let AnalysisRequest {
            source,
            declared_format,
            ..
        } = request;

        let bytes = read_source(source).await?;
        *record = self.mirror(result, declared_format, &bytes).await;

        let format = detect_format(&result.file_name, declared_format)?;
        let profile = self.parsers.parse(format, &bytes)?;
        debug!(
            format = format.as_str(),
            rows = profile.total_rows,
            fields = profile.fields.len(),
            "Parsed upload"
        );

        let recommendation = self.engine.recommend(&profile);
        let adjusted = self.scorer.adjust(&profile);
        result.attach_profile(profile.clone(), recommendation, adjusted)?;

        self.enrich(result, &profile).await?;
        self.attach_ddl(result, &profile).await?;

        let file_path = record
            .as_ref()
            .map(|r| r.storage_path.clone())
            .unwrap_or_else(|| result.file_name.clone());
        self.trigger_workflow(result, &file_path).await
    }

    /// Copies the raw bytes to the object store. Never fails the analysis.
    async fn mirror(
        &self,
        result: &AnalysisResult,
        declared_format: Option<DataFormat>,
        bytes: &[u8],
    ) -> Option<FileRecord> {
        let storage = self.storage.as_deref()?;
        let bucket = self.config.bucket();
        let key = object_key(&result.user_id, &result.file_name);
        let content_type = DataFormat::from_filename(&result.file_name)
            .or(declared_format)
            .map(|f| f.content_type())
            .unwrap_or(OCTET_STREAM);

        let limit = self.config.storage_timeout();
        let put = storage.put(bucket, &key, bytes.to_vec(), content_type);
        let error = match timeout(limit, put).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(ProfilerError::timeout("object store put", limit)),
        };
        if let Some(e) = error {
            warn!(
                backend = storage.backend_name(),
                bucket,
                key = %key,
                error = %e,
                "Could not mirror upload, continuing without it"
            );
            return None;
        }
        crate::log_data_op!(
            self.config.log_config(),
            backend = storage.backend_name(),
            bucket,
            key = %key,
            size = bytes.len(),
            "Mirrored upload"
        );

        let now = Utc::now();
        let record = FileRecord {
            id: result.file_id.clone(),
            user_id: result.user_id.clone(),
            filename: result.file_name.clone(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            storage_path: key,
            bucket: bucket.to_string(),
            checksum: hex::encode(Sha256::digest(bytes)),
            status: FileStatus::Processing,
            created_at: now,
            updated_at: now,
        };
        self.save_file(&record).await;
        Some(record)
    }

    async fn enrich(&self, result: &mut AnalysisResult, profile: &DataProfile) -> Result<()> {
        let Some(llm) = self.llm.as_deref() else {
            return Ok(());
        };
        if !self.config.llm_enrichment() {
            return Ok(());
        }

        let request = prompts::analysis_request(profile, &result.recommendations, &result.file_name);
        match self.call_llm(llm, &request).await {
            Ok(analysis) => {
                let extracted = extract_recommendations(&analysis);
                debug!(
                    backend = llm.name(),
                    extracted = extracted.len(),
                    "LLM analysis received"
                );
                result.attach_llm_analysis(analysis, extracted)
            }
            Err(e) => {
                warn!(backend = llm.name(), error = %e, "LLM analysis unavailable");
                Ok(())
            }
        }
    }

    /// Prefers model-generated DDL, falling back to the rendered script.
    async fn attach_ddl(&self, result: &mut AnalysisResult, profile: &DataProfile) -> Result<()> {
        if !self.config.generate_ddl() {
            return Ok(());
        }
        let (Some(schema), Some(system)) = (
            result.table_schema.clone(),
            result
                .storage_recommendation
                .as_ref()
                .map(|s| s.primary_storage),
        ) else {
            return Ok(());
        };

        if let Some(llm) = self.llm.as_deref() {
            let request = prompts::ddl_request(profile, &schema, system);
            match self.call_llm(llm, &request).await {
                Ok(text) => {
                    let script = strip_code_fences(&text);
                    if !script.trim().is_empty() {
                        return result.attach_ddl(script, DdlSource::Llm);
                    }
                    warn!(backend = llm.name(), "LLM returned empty DDL");
                }
                Err(e) => warn!(backend = llm.name(), error = %e, "LLM DDL generation failed"),
            }
        }

        match ddl::render(&schema, system) {
            Ok(script) => result.attach_ddl(script, DdlSource::Fallback),
            Err(e) => {
                warn!(storage = system.as_str(), error = %e, "Skipping DDL");
                Ok(())
            }
        }
    }

    async fn trigger_workflow(&self, result: &mut AnalysisResult, file_path: &str) -> Result<()> {
        if !self.config.trigger_workflow() {
            return Ok(());
        }
        let Some(workflow) = self.workflow.as_deref() else {
            return Ok(());
        };

        let conf = DagRunConf::for_analysis(result, file_path);
        let dag_id = self.config.dag_id();
        let limit = self.config.workflow_timeout();
        let error = match timeout(limit, workflow.trigger(dag_id, &conf)).await {
            Ok(Ok(run_id)) => {
                info!(dag_id, run_id = %run_id, "Workflow triggered");
                return result.attach_workflow_run(run_id);
            }
            Ok(Err(e)) => ProfilerError::from(e),
            Err(_) => ProfilerError::timeout("workflow trigger", limit),
        };
        warn!(dag_id, error = %error, "Workflow trigger failed");
        Ok(())
    }

    /// One LLM call with timeout and retries on transient failures.
    async fn call_llm(&self, llm: &dyn LlmBackend, request: &LlmRequest) -> Result<String> {
        let operation = request.operation_type.as_str();
        let limit = if request.operation_type.is_long_running() {
            self.config.long_llm_timeout()
        } else {
            self.config.llm_timeout()
        };

        let mut attempt = 0;
        loop {
            let (error, retry_after) = match timeout(limit, llm.complete(request)).await {
                Ok(Ok(response)) => match response.into_content() {
                    Ok(content) => {
                        let logs = self.config.log_config();
                        if logs.log_payloads {
                            debug!(operation, excerpt = %logs.excerpt(&content), "LLM response");
                        }
                        return Ok(content);
                    }
                    Err(e) => (ProfilerError::from(e), None),
                },
                Ok(Err(e)) => {
                    let retry_after = e.retry_after();
                    (ProfilerError::from(e), retry_after)
                }
                Err(_) => (ProfilerError::timeout(format!("llm {operation}"), limit), None),
            };

            if !error.is_retryable() || attempt >= self.config.llm_max_retries() {
                return Err(error);
            }
            if let Some(secs) = retry_after.filter(|&secs| Duration::from_secs(secs) > limit) {
                warn!(
                    operation,
                    retry_after_secs = secs,
                    timeout_ms = limit.as_millis() as u64,
                    "LLM asked to wait longer than the call timeout, giving up"
                );
                return Err(error);
            }
            let delay = calculate_backoff(
                self.config.retry_base_delay(),
                attempt,
                retry_after,
                self.config.max_retry_delay(),
            );
            warn!(
                operation,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying LLM call"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn persist(&self, repository: Option<&dyn AnalysisRepository>, result: &AnalysisResult) {
        let Some(repository) = repository else {
            return;
        };
        if let Err(e) = repository.save_analysis(result).await {
            warn!(status = %result.status, error = %e, "Could not persist analysis");
        }
    }

    async fn save_file(&self, record: &FileRecord) {
        let Some(files) = self.files.as_deref() else {
            return;
        };
        match files.save_file(record).await {
            Ok(()) => crate::log_data_op!(
                self.config.log_config(),
                file_id = %record.id,
                status = ?record.status,
                "Saved file record"
            ),
            Err(e) => warn!(file_id = %record.id, error = %e, "Could not save file record"),
        }
    }
}

async fn read_source(source: UploadSource) -> Result<Vec<u8>> {
    match source {
        UploadSource::Bytes(bytes) => Ok(bytes),
        UploadSource::Path(path) => Ok(tokio::fs::read(&path).await?),
    }
}

/// Exponential backoff with jitter: `base * 2^min(retry, 5)` plus up to one
/// base (at most one second) of random delay, never more than `cap`. A
/// server supplied `retry_after` replaces the base.
fn calculate_backoff(
    base: Duration,
    retry_count: u32,
    retry_after: Option<u64>,
    cap: Duration,
) -> Duration {
    let base = retry_after.map(Duration::from_secs).unwrap_or(base).min(cap);
    let backoff = base
        .checked_mul(1u32 << retry_count.min(5))
        .unwrap_or(cap);

    let jitter_cap = u64::try_from(base.as_millis()).unwrap_or(u64::MAX).min(1000);
    let jitter_ms = if jitter_cap == 0 {
        0
    } else {
        rand::rng().random_range(0..jitter_cap)
    };
    backoff
        .saturating_add(Duration::from_millis(jitter_ms))
        .min(cap)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::core::StorageSystem;
    use crate::llm::{LlmError, LlmResponse, LlmResult, OperationType, LLM_PREFIX};
    use crate::repository::InMemoryRepository;
    use crate::store::InMemoryObjectStorage;
    use crate::workflow::{DagRunStatus, WorkflowError, WorkflowResult};

    const PEOPLE: &str = "name;age\nJohn;30\nJane;25";

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_retry_base_delay(Duration::ZERO)
    }

    fn people() -> AnalysisRequest {
        AnalysisRequest::from_bytes("user_1", "people.csv", PEOPLE)
    }

    /// Answers every call with the same error and counts the attempts.
    struct FailingLlm {
        calls: AtomicUsize,
        retryable: bool,
    }

    impl FailingLlm {
        fn new(retryable: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                retryable,
            })
        }
    }

    #[async_trait]
    impl LlmBackend for FailingLlm {
        async fn complete(&self, _request: &LlmRequest) -> LlmResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.retryable {
                Err(LlmError::Network {
                    message: "connection refused".to_string(),
                })
            } else {
                Err(LlmError::Authentication {
                    message: "bad key".to_string(),
                })
            }
        }
    }

    struct ScriptedLlm;

    #[async_trait]
    impl LlmBackend for ScriptedLlm {
        async fn complete(&self, request: &LlmRequest) -> LlmResult<LlmResponse> {
            let content = match request.operation_type {
                OperationType::DdlGeneration => {
                    "```sql\nCREATE TABLE analyzed_data (name TEXT, age NUMERIC);\n```"
                }
                _ => "The data is clean.\nRecommendation: index the age column\n- keep names as text",
            };
            Ok(LlmResponse {
                content: content.to_string(),
                status: "success".to_string(),
                error: None,
            })
        }
    }

    struct ErrorPayloadLlm {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmBackend for ErrorPayloadLlm {
        async fn complete(&self, _request: &LlmRequest) -> LlmResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::from_str(r#"{"message": "partial", "status": "ok", "error": "model overloaded"}"#)
                .map_err(|e| LlmError::Serialization {
                    message: e.to_string(),
                })?)
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmBackend for SlowLlm {
        async fn complete(&self, _request: &LlmRequest) -> LlmResult<LlmResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(LlmResponse::default())
        }
    }

    /// Always rate limited with a fixed `Retry-After`.
    struct RateLimitedLlm {
        calls: AtomicUsize,
        retry_after_secs: u64,
    }

    impl RateLimitedLlm {
        fn new(retry_after_secs: u64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                retry_after_secs,
            })
        }
    }

    #[async_trait]
    impl LlmBackend for RateLimitedLlm {
        async fn complete(&self, _request: &LlmRequest) -> LlmResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::RateLimited {
                retry_after_secs: Some(self.retry_after_secs),
            })
        }
    }

    struct BrokenStorage;

    #[async_trait]
    impl ObjectStorage for BrokenStorage {
        async fn put(&self, _: &str, _: &str, _: Vec<u8>, _: &str) -> Result<()> {
            Err(ProfilerError::object_store("put", "connection refused"))
        }

        async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
            Err(ProfilerError::not_found("object", format!("{bucket}/{key}")))
        }

        async fn delete(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn list(&self, _: &str, _: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn exists(&self, _: &str, _: &str) -> Result<bool> {
            Ok(false)
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    struct RecordingWorkflow {
        confs: std::sync::Mutex<Vec<DagRunConf>>,
    }

    #[async_trait]
    impl WorkflowTrigger for RecordingWorkflow {
        async fn trigger(&self, _dag_id: &str, conf: &DagRunConf) -> WorkflowResult<String> {
            self.confs.lock().unwrap().push(conf.clone());
            Ok("manual__2024-01-01T00:00:00".to_string())
        }

        async fn status(&self, _dag_id: &str, _run_id: &str) -> WorkflowResult<DagRunStatus> {
            Err(WorkflowError::NotFound {
                message: "not tracked".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_run_without_adapters_completes() {
        let result = AnalysisRunner::new(config()).run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(result.analysis_id.starts_with("analysis_"));
        assert!(result.file_id.starts_with("file_"));
        assert!(result.completed_at.is_some());
        assert!(result.error.is_none());
        assert!(result.llm_analysis.is_none());
        assert_eq!(result.data_profile.as_ref().unwrap().total_rows, 2);
        assert_eq!(
            result.storage_recommendation.as_ref().unwrap().primary_storage,
            StorageSystem::PostgreSQL
        );
        assert_eq!(result.ddl_source, Some(DdlSource::Fallback));
        assert!(result
            .ddl_script
            .as_deref()
            .unwrap()
            .starts_with("CREATE TABLE IF NOT EXISTS \"analyzed_data\""));
    }

    #[tokio::test]
    async fn test_unsupported_format_fails() {
        let request = AnalysisRequest::from_bytes("user_1", "notes.txt", "hello");
        let result = AnalysisRunner::new(config()).run(request).await;

        assert_eq!(result.status, AnalysisStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("notes.txt"));
        assert!(result.data_profile.is_none());
    }

    #[tokio::test]
    async fn test_declared_format_used_without_extension() {
        let request = AnalysisRequest::from_bytes("user_1", "export", r#"[{"id": 1}]"#)
            .with_declared_format(DataFormat::Json);
        let result = AnalysisRunner::new(config()).run(request).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(
            result.data_profile.unwrap().data_type,
            DataFormat::Json
        );
    }

    #[tokio::test]
    async fn test_malformed_json_fails() {
        let request = AnalysisRequest::from_bytes("user_1", "broken.json", "{not json");
        let result = AnalysisRunner::new(config()).run(request).await;

        assert_eq!(result.status, AnalysisStatus::Failed);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_missing_path_fails() {
        let request = AnalysisRequest::from_path("user_1", "/definitely/not/here/people.csv");
        let result = AnalysisRunner::new(config()).run(request).await;

        assert_eq!(result.status, AnalysisStatus::Failed);
        assert!(result.error.as_deref().unwrap().starts_with("IO error"));
    }

    #[tokio::test]
    async fn test_failing_llm_is_not_fatal() {
        let llm = FailingLlm::new(true);
        let runner = AnalysisRunner::new(config().with_llm_max_retries(2)).with_llm(llm.clone());
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(result.llm_analysis.is_none());
        assert!(result.llm_recommendations.is_empty());
        assert_eq!(result.ddl_source, Some(DdlSource::Fallback));
        // analysis and DDL calls, each tried three times
        assert_eq!(llm.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_non_retryable_llm_error_is_not_retried() {
        let llm = FailingLlm::new(false);
        let runner = AnalysisRunner::new(config()).with_llm(llm.clone());
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_payload_counts_as_failure() {
        let llm = Arc::new(ErrorPayloadLlm {
            calls: AtomicUsize::new(0),
        });
        let runner = AnalysisRunner::new(config()).with_llm(llm.clone());
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(result.llm_analysis.is_none());
        assert_eq!(result.ddl_source, Some(DdlSource::Fallback));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_llm_enrichment_and_ddl() {
        let runner = AnalysisRunner::new(config()).with_llm(Arc::new(ScriptedLlm));
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(result.llm_analysis.as_deref().unwrap().contains("clean"));
        assert!(!result.llm_recommendations.is_empty());
        assert!(result
            .llm_recommendations
            .iter()
            .all(|r| r.starts_with(LLM_PREFIX)));
        assert_eq!(result.ddl_source, Some(DdlSource::Llm));
        assert_eq!(
            result.ddl_script.as_deref(),
            Some("CREATE TABLE analyzed_data (name TEXT, age NUMERIC);")
        );
    }

    #[tokio::test]
    async fn test_enrichment_can_be_disabled() {
        let runner = AnalysisRunner::new(config().with_llm_enrichment(false).with_ddl_generation(false))
            .with_llm(Arc::new(ScriptedLlm));
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(result.llm_analysis.is_none());
        assert!(result.ddl_script.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_timeout_is_not_fatal() {
        let runner = AnalysisRunner::new(
            config()
                .with_llm_timeout(Duration::from_secs(1))
                .with_long_llm_timeout(Duration::from_secs(2))
                .with_llm_max_retries(0),
        )
        .with_llm(Arc::new(SlowLlm));
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(result.llm_analysis.is_none());
        assert_eq!(result.ddl_source, Some(DdlSource::Fallback));
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_fatal() {
        let files = Arc::new(InMemoryRepository::new());
        let runner = AnalysisRunner::new(config())
            .with_storage(Arc::new(BrokenStorage))
            .with_file_repository(files.clone());
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(files.file_count().await, 0);
    }

    #[tokio::test]
    async fn test_mirror_records_file() {
        let storage = InMemoryObjectStorage::new();
        let repo = Arc::new(InMemoryRepository::new());
        let runner = AnalysisRunner::new(config())
            .with_storage(Arc::new(storage.clone()))
            .with_file_repository(repo.clone())
            .with_analysis_repository(repo.clone());
        let result = runner.run(people()).await;

        let record = repo.get_file(&result.file_id).await.unwrap().unwrap();
        assert_eq!(record.status, FileStatus::Processed);
        assert_eq!(record.content_type, "text/csv");
        assert_eq!(record.size, PEOPLE.len() as u64);
        assert_eq!(record.checksum.len(), 64);
        assert!(record.storage_path.starts_with("users/user_1/files/"));
        assert!(record.storage_path.ends_with("_people.csv"));

        let stored = storage
            .get("ai-data-engineer", &record.storage_path)
            .await
            .unwrap();
        assert_eq!(stored, PEOPLE.as_bytes());

        let persisted = repo.get_analysis(&result.analysis_id).await.unwrap().unwrap();
        assert_eq!(persisted, result);
    }

    #[tokio::test]
    async fn test_failed_analysis_marks_file_error() {
        let repo = Arc::new(InMemoryRepository::new());
        let runner = AnalysisRunner::new(config())
            .with_storage(Arc::new(InMemoryObjectStorage::new()))
            .with_file_repository(repo.clone());
        let result = runner
            .run(AnalysisRequest::from_bytes("user_1", "empty.csv", ""))
            .await;

        assert_eq!(result.status, AnalysisStatus::Failed);
        let record = repo.get_file(&result.file_id).await.unwrap().unwrap();
        assert_eq!(record.status, FileStatus::Error);
    }

    #[tokio::test]
    async fn test_workflow_run_recorded() {
        let workflow = Arc::new(RecordingWorkflow {
            confs: std::sync::Mutex::new(Vec::new()),
        });
        let runner = AnalysisRunner::new(config().with_workflow_trigger(true))
            .with_workflow(workflow.clone());
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(
            result.workflow_run_id.as_deref(),
            Some("manual__2024-01-01T00:00:00")
        );
        let confs = workflow.confs.lock().unwrap();
        assert_eq!(confs.len(), 1);
        assert_eq!(confs[0].file_path, "people.csv");
        assert_eq!(confs[0].row_count, Some(2));
    }

    #[tokio::test]
    async fn test_terminal_result_is_left_alone() {
        let runner = AnalysisRunner::new(config());
        let mut result = runner.prepare(&people());
        result.fail("cancelled").unwrap();

        let result = runner.execute(result, people()).await;
        assert_eq!(result.status, AnalysisStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_retry_after_gives_up_without_waiting() {
        let llm = RateLimitedLlm::new(u64::MAX);
        let runner = AnalysisRunner::new(config()).with_llm(llm.clone());

        let started = tokio::time::Instant::now();
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(result.llm_analysis.is_none());
        assert_eq!(result.ddl_source, Some(DdlSource::Fallback));
        assert!(started.elapsed() < Duration::from_secs(1));
        // one attempt per LLM step, no retries
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_past_timeout_is_not_slept() {
        let llm = RateLimitedLlm::new(3600);
        let runner = AnalysisRunner::new(config()).with_llm(llm.clone());

        let started = tokio::time::Instant::now();
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_capped_by_max_retry_delay() {
        let llm = RateLimitedLlm::new(20);
        let runner = AnalysisRunner::new(
            config()
                .with_llm_max_retries(2)
                .with_max_retry_delay(Duration::from_secs(2)),
        )
        .with_llm(llm.clone());

        let started = tokio::time::Instant::now();
        let result = runner.run(people()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 6);
        // two LLM steps, two capped waits each
        assert!(started.elapsed() <= Duration::from_secs(8));
    }

    const CAP: Duration = Duration::from_secs(60);

    #[test]
    fn test_calculate_backoff() {
        let base = Duration::from_secs(1);

        let delay0 = calculate_backoff(base, 0, None, CAP);
        assert!(delay0 >= Duration::from_secs(1));
        assert!(delay0 < Duration::from_secs(2));

        let delay1 = calculate_backoff(base, 1, None, CAP);
        assert!(delay1 >= Duration::from_secs(2));
        assert!(delay1 < Duration::from_secs(3));

        let delay_capped = calculate_backoff(base, 10, None, CAP);
        assert!(delay_capped >= Duration::from_secs(32));
        assert!(delay_capped < Duration::from_secs(33));
    }

    #[test]
    fn test_calculate_backoff_uses_retry_after() {
        let delay = calculate_backoff(Duration::from_millis(10), 2, Some(5), CAP);
        assert!(delay >= Duration::from_secs(20));
        assert!(delay < Duration::from_secs(21));
    }

    #[test]
    fn test_calculate_backoff_never_exceeds_cap() {
        assert_eq!(calculate_backoff(Duration::from_secs(1), 0, Some(u64::MAX), CAP), CAP);
        assert_eq!(calculate_backoff(Duration::MAX, 5, None, CAP), CAP);
        assert_eq!(
            calculate_backoff(Duration::from_secs(10), 3, None, Duration::from_secs(15)),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_calculate_backoff_zero_base() {
        assert_eq!(calculate_backoff(Duration::ZERO, 3, None, CAP), Duration::ZERO);
    }
}
