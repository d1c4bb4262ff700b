//! Pipeline and service configuration.
//!
//! [`PipelineConfig`] is built in code and passed to the
//! [`AnalysisRunner`](crate::pipeline::AnalysisRunner). [`ServiceSettings`]
//! reads the adapter endpoints and credentials from `PROFILER_*` environment
//! variables.

use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::analyzers::schema::DEFAULT_TABLE_NAME;
use crate::error::{ProfilerError, Result};
use crate::ids::IdScheme;
use crate::logging::LogConfig;
use crate::security::SecureString;
#[cfg(feature = "cloud-storage")]
use crate::store::ObjectStoreBackend;
#[cfg(feature = "s3")]
use crate::store::S3Settings;

/// Default object store bucket for uploads.
pub const DEFAULT_BUCKET: &str = "ai-data-engineer";

/// Default DAG triggered after a completed analysis.
pub const DEFAULT_DAG_ID: &str = "data_analysis_pipeline";

/// Environment variable prefix read by [`ServiceSettings::from_env`].
pub const ENV_PREFIX: &str = "PROFILER_";

/// Region used for S3 endpoints when `PROFILER_S3_REGION` is unset.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Orchestrator behaviour: timeouts, retries and optional steps.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    bucket: String,
    table_name: String,
    storage_timeout: Duration,
    llm_timeout: Duration,
    long_llm_timeout: Duration,
    workflow_timeout: Duration,
    llm_max_retries: u32,
    retry_base_delay: Duration,
    max_retry_delay: Duration,
    llm_enrichment: bool,
    generate_ddl: bool,
    trigger_workflow: bool,
    dag_id: String,
    id_scheme: IdScheme,
    queue_capacity: usize,
    max_concurrency: usize,
    log_config: LogConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            storage_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(30),
            long_llm_timeout: Duration::from_secs(600),
            workflow_timeout: Duration::from_secs(30),
            llm_max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(60),
            llm_enrichment: true,
            generate_ddl: true,
            trigger_workflow: false,
            dag_id: DEFAULT_DAG_ID.to_string(),
            id_scheme: IdScheme::Uuid,
            queue_capacity: 64,
            max_concurrency: 4,
            log_config: LogConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket uploads are mirrored to.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Set the name of the derived table.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Set the per-call object store timeout.
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Set the timeout for short LLM calls (data analysis).
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    /// Set the timeout for DDL generation and file analysis LLM calls.
    pub fn with_long_llm_timeout(mut self, timeout: Duration) -> Self {
        self.long_llm_timeout = timeout;
        self
    }

    /// Set the workflow trigger timeout.
    pub fn with_workflow_timeout(mut self, timeout: Duration) -> Self {
        self.workflow_timeout = timeout;
        self
    }

    /// Set how many times a retryable LLM failure is retried.
    pub fn with_llm_max_retries(mut self, retries: u32) -> Self {
        self.llm_max_retries = retries;
        self
    }

    /// Set the first backoff delay; each retry doubles it.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the longest single wait between LLM retries.
    pub fn with_max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    pub fn with_llm_enrichment(mut self, enabled: bool) -> Self {
        self.llm_enrichment = enabled;
        self
    }

    pub fn with_ddl_generation(mut self, enabled: bool) -> Self {
        self.generate_ddl = enabled;
        self
    }

    pub fn with_workflow_trigger(mut self, enabled: bool) -> Self {
        self.trigger_workflow = enabled;
        self
    }

    pub fn with_dag_id(mut self, dag_id: impl Into<String>) -> Self {
        self.dag_id = dag_id.into();
        self
    }

    pub fn with_id_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    /// Set the bounded queue size for background submissions.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set how many background analyses may run at once.
    pub fn with_max_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.max(1);
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    pub fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    pub fn long_llm_timeout(&self) -> Duration {
        self.long_llm_timeout
    }

    pub fn workflow_timeout(&self) -> Duration {
        self.workflow_timeout
    }

    pub fn llm_max_retries(&self) -> u32 {
        self.llm_max_retries
    }

    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }

    pub fn max_retry_delay(&self) -> Duration {
        self.max_retry_delay
    }

    pub fn llm_enrichment(&self) -> bool {
        self.llm_enrichment
    }

    pub fn generate_ddl(&self) -> bool {
        self.generate_ddl
    }

    pub fn trigger_workflow(&self) -> bool {
        self.trigger_workflow
    }

    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    pub fn id_scheme(&self) -> IdScheme {
        self.id_scheme
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }
}

#[derive(Deserialize)]
struct RawSettings {
    llm_endpoint: Option<String>,
    llm_api_key: Option<String>,
    llm_model: Option<String>,
    store_root: Option<String>,
    s3_endpoint: Option<String>,
    s3_region: Option<String>,
    s3_access_key: Option<String>,
    s3_secret_key: Option<String>,
    airflow_url: Option<String>,
    airflow_user: Option<String>,
    airflow_password: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Adapter endpoints and credentials loaded from the environment.
///
/// | variable | meaning |
/// |---|---|
/// | `PROFILER_LLM_ENDPOINT` | LLM service URL |
/// | `PROFILER_LLM_API_KEY` | bearer token for the LLM service |
/// | `PROFILER_LLM_MODEL` | model name forwarded in requests |
/// | `PROFILER_STORE_ROOT` | local directory used as object store |
/// | `PROFILER_S3_ENDPOINT` / `_REGION` / `_ACCESS_KEY` / `_SECRET_KEY` | S3 or MinIO |
/// | `PROFILER_AIRFLOW_URL` / `_USER` / `_PASSWORD` | workflow trigger |
/// | `PROFILER_LOG_LEVEL` / `PROFILER_LOG_JSON` | logging |
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<SecureString>,
    pub llm_model: Option<String>,
    pub store_root: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_region: Option<String>,
    pub s3_access_key: Option<SecureString>,
    pub s3_secret_key: Option<SecureString>,
    pub airflow_url: Option<String>,
    pub airflow_user: Option<String>,
    pub airflow_password: Option<SecureString>,
    pub log_level: String,
    pub log_json: bool,
}

impl ServiceSettings {
    /// Loads settings from `PROFILER_*` process environment variables.
    pub fn from_env() -> Result<Self> {
        let raw = envy::prefixed(ENV_PREFIX)
            .from_env::<RawSettings>()
            .map_err(|e| ProfilerError::Configuration(e.to_string()))?;
        Ok(raw.into())
    }

    /// Loads settings from explicit `(name, value)` pairs, prefix included.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, RawSettings>(vars)
            .map_err(|e| ProfilerError::Configuration(e.to_string()))?;
        Ok(raw.into())
    }

    /// The `PROFILER_LOG_LEVEL` value as a tracing level.
    pub fn tracing_level(&self) -> Result<Level> {
        self.log_level.trim().parse::<Level>().map_err(|_| {
            ProfilerError::Configuration(format!(
                "invalid {ENV_PREFIX}LOG_LEVEL '{}': expected trace, debug, info, warn or error",
                self.log_level
            ))
        })
    }

    /// S3 connection settings, present when `PROFILER_S3_ENDPOINT` is set.
    #[cfg(feature = "s3")]
    pub fn s3_settings(&self) -> Option<S3Settings> {
        let endpoint = self.s3_endpoint.as_ref().filter(|e| !e.trim().is_empty())?;
        Some(S3Settings {
            endpoint: Some(endpoint.clone()),
            region: self
                .s3_region
                .clone()
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            access_key: self.s3_access_key.clone(),
            secret_key: self.s3_secret_key.clone(),
            allow_http: endpoint.starts_with("http://"),
        })
    }

    /// Object store for upload mirroring. A local `store_root` wins over an
    /// S3 endpoint; `None` when neither is configured.
    #[cfg(feature = "cloud-storage")]
    pub fn object_storage(&self) -> Option<ObjectStoreBackend> {
        if let Some(root) = self.store_root.as_ref().filter(|r| !r.trim().is_empty()) {
            return Some(ObjectStoreBackend::local(root));
        }
        self.s3_backend()
    }

    #[cfg(feature = "s3")]
    fn s3_backend(&self) -> Option<ObjectStoreBackend> {
        self.s3_settings().map(ObjectStoreBackend::s3)
    }

    #[cfg(all(feature = "cloud-storage", not(feature = "s3")))]
    fn s3_backend(&self) -> Option<ObjectStoreBackend> {
        if self.s3_endpoint.is_some() {
            tracing::warn!("{ENV_PREFIX}S3_ENDPOINT is set but the s3 feature is disabled");
        }
        None
    }
}

impl From<RawSettings> for ServiceSettings {
    fn from(raw: RawSettings) -> Self {
        let secret = |value: Option<String>| value.filter(|v| !v.is_empty()).map(SecureString::new);
        Self {
            llm_endpoint: raw.llm_endpoint,
            llm_api_key: secret(raw.llm_api_key),
            llm_model: raw.llm_model,
            store_root: raw.store_root,
            s3_endpoint: raw.s3_endpoint,
            s3_region: raw.s3_region,
            s3_access_key: secret(raw.s3_access_key),
            s3_secret_key: secret(raw.s3_secret_key),
            airflow_url: raw.airflow_url,
            airflow_user: raw.airflow_user,
            airflow_password: secret(raw.airflow_password),
            log_level: raw.log_level,
            log_json: raw.log_json,
        }
    }
}
