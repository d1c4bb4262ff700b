use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{DagRunConf, DagRunStatus, TaskState, WorkflowError, WorkflowResult, WorkflowTrigger};
use crate::security::SecureString;

/// Connection settings for the Airflow REST API.
#[derive(Debug, Clone)]
pub struct AirflowConfig {
    base_url: String,
    username: String,
    password: SecureString,
    timeout: Duration,
}

impl AirflowConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureString>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Serialize)]
struct TriggerBody<'a> {
    conf: &'a DagRunConf,
    logical_date: String,
}

#[derive(Deserialize)]
struct DagRunBody {
    dag_id: String,
    dag_run_id: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Deserialize)]
struct TaskInstancesBody {
    #[serde(default)]
    task_instances: Vec<TaskState>,
}

/// Response from the health endpoint.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub metadatabase: ComponentHealth,
    pub scheduler: ComponentHealth,
}

#[derive(Debug, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
}

/// HTTP client for the Airflow stable REST API (v1), using basic auth.
#[derive(Clone)]
pub struct AirflowClient {
    config: Arc<AirflowConfig>,
    client: Client,
}

impl AirflowClient {
    /// Create a new client with the given configuration.
    pub fn new(config: AirflowConfig) -> WorkflowResult<Self> {
        if config.base_url.is_empty() {
            return Err(WorkflowError::Configuration {
                message: "Airflow base URL is empty".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkflowError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &AirflowConfig {
        &self.config
    }

    /// Check that the webserver and its scheduler are reachable.
    pub async fn health_check(&self) -> WorkflowResult<HealthResponse> {
        let url = format!("{}/health", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WorkflowError::Network {
                message: e.to_string(),
            })?;
        self.handle_response(response).await
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.config.username, Some(self.config.password.expose()))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> WorkflowResult<T> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| WorkflowError::Network {
                message: e.to_string(),
            })?;
        self.handle_response(response).await
    }

    /// Handle a successful or error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> WorkflowResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| WorkflowError::Serialization {
                    message: e.to_string(),
                });
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(WorkflowError::Authentication { message: body }),
            404 => Err(WorkflowError::NotFound { message: body }),
            409 => Err(WorkflowError::Conflict { message: body }),
            status => Err(WorkflowError::ServerError {
                status,
                message: body,
            }),
        }
    }
}

#[async_trait]
impl WorkflowTrigger for AirflowClient {
    #[instrument(skip(self, conf), fields(file_id = %conf.file_id))]
    async fn trigger(&self, dag_id: &str, conf: &DagRunConf) -> WorkflowResult<String> {
        let url = format!("{}/api/v1/dags/{}/dagRuns", self.config.base_url, dag_id);
        let body = TriggerBody {
            conf,
            logical_date: Utc::now().to_rfc3339(),
        };
        let run: DagRunBody = self.send(self.client.post(&url).json(&body)).await?;
        info!(dag_id = %run.dag_id, run_id = %run.dag_run_id, "Triggered DAG run");
        Ok(run.dag_run_id)
    }

    #[instrument(skip(self))]
    async fn status(&self, dag_id: &str, run_id: &str) -> WorkflowResult<DagRunStatus> {
        let run_url = format!(
            "{}/api/v1/dags/{}/dagRuns/{}",
            self.config.base_url, dag_id, run_id
        );
        let run: DagRunBody = self.send(self.client.get(&run_url)).await?;
        let tasks: TaskInstancesBody = self
            .send(self.client.get(format!("{run_url}/taskInstances")))
            .await?;

        Ok(DagRunStatus {
            dag_id: run.dag_id,
            run_id: run.dag_run_id,
            state: run.state.unwrap_or_else(|| "queued".to_string()),
            start_date: run.start_date,
            end_date: run.end_date,
            tasks: tasks.task_instances,
        })
    }
}
