use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use super::{AnalysisRequest, AnalysisRunner};
use crate::core::{AnalysisResult, AnalysisStatus};
use crate::error::{ProfilerError, Result};
use crate::repository::AnalysisRepository;

/// Returned by [`AnalysisQueue::submit`]; poll with the `analysis_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisHandle {
    pub analysis_id: String,
    pub file_id: String,
    pub status: AnalysisStatus,
}

/// Statistics from the analysis worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    pub completed: u64,
    pub failed: u64,
    /// Tasks that panicked; their results are marked failed.
    pub panicked: u64,
}

struct Job {
    result: AnalysisResult,
    request: AnalysisRequest,
}

/// Submit-then-poll front end for background analyses.
///
/// Clones share the same queue.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use ingest_profiler::config::PipelineConfig;
/// use ingest_profiler::core::AnalysisStatus;
/// use ingest_profiler::pipeline::{AnalysisQueue, AnalysisRequest, AnalysisRunner};
/// use ingest_profiler::repository::InMemoryRepository;
/// use tokio::sync::watch;
///
/// # #[tokio::main]
/// # async fn main() {
/// let runner = Arc::new(AnalysisRunner::new(PipelineConfig::default()));
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let (queue, worker) = AnalysisQueue::spawn(runner, Arc::new(InMemoryRepository::new()), shutdown_rx);
///
/// let handle = queue
///     .submit(AnalysisRequest::from_bytes("user_1", "people.csv", "name;age\nJohn;30"))
///     .await
///     .unwrap();
/// assert_eq!(handle.status, AnalysisStatus::Pending);
///
/// let result = queue
///     .wait(&handle.analysis_id, Duration::from_millis(10), Duration::from_secs(5))
///     .await
///     .unwrap();
/// assert_eq!(result.status, AnalysisStatus::Completed);
///
/// shutdown_tx.send(true).unwrap();
/// let stats = worker.await.unwrap();
/// assert_eq!(stats.completed, 1);
/// # }
/// ```
#[derive(Clone)]
pub struct AnalysisQueue {
    runner: Arc<AnalysisRunner>,
    repository: Arc<dyn AnalysisRepository>,
    sender: mpsc::Sender<Job>,
}

impl AnalysisQueue {
    /// Starts the background worker.
    ///
    /// The worker runs until `shutdown` flips to `true` or every queue clone
    /// is dropped, and returns its statistics.
    pub fn spawn(
        runner: Arc<AnalysisRunner>,
        repository: Arc<dyn AnalysisRepository>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<WorkerStats>) {
        let (sender, receiver) = mpsc::channel(runner.config().queue_capacity());
        let worker = AnalysisWorker {
            permits: Arc::new(Semaphore::new(runner.config().max_concurrency())),
            runner: runner.clone(),
            repository: repository.clone(),
            receiver,
            shutdown,
            tasks: JoinSet::new(),
            running: HashMap::new(),
            stats: WorkerStats::default(),
        };
        let handle = tokio::spawn(worker.run());
        (
            Self {
                runner,
                repository,
                sender,
            },
            handle,
        )
    }

    /// Persists a `pending` result and queues the analysis.
    ///
    /// Waits for room when the queue is full. Fails once the worker has
    /// stopped; the persisted result is then marked failed.
    #[instrument(skip_all, fields(user_id = %request.user_id, file_name = %request.file_name))]
    pub async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisHandle> {
        let result = self.runner.prepare(&request);
        self.repository.save_analysis(&result).await?;

        let handle = AnalysisHandle {
            analysis_id: result.analysis_id.clone(),
            file_id: result.file_id.clone(),
            status: result.status,
        };

        if let Err(mpsc::error::SendError(job)) = self.sender.send(Job { result, request }).await {
            let mut result = job.result;
            let error = ProfilerError::Internal("analysis worker is not running".to_string());
            result.fail(&error)?;
            self.repository.save_analysis(&result).await?;
            return Err(error);
        }

        debug!(analysis_id = %handle.analysis_id, "Analysis queued");
        Ok(handle)
    }

    /// Current state of a submitted analysis.
    pub async fn status(&self, analysis_id: &str) -> Result<AnalysisResult> {
        self.repository
            .get_analysis(analysis_id)
            .await?
            .ok_or_else(|| ProfilerError::not_found("analysis", analysis_id))
    }

    /// Polls [`status`](Self::status) every `interval` until the analysis is
    /// terminal, failing with [`ProfilerError::Timeout`] after `deadline`.
    pub async fn wait(
        &self,
        analysis_id: &str,
        interval: Duration,
        deadline: Duration,
    ) -> Result<AnalysisResult> {
        let poll = async {
            loop {
                let result = self.status(analysis_id).await?;
                if result.is_terminal() {
                    return Ok(result);
                }
                tokio::time::sleep(interval).await;
            }
        };
        tokio::time::timeout(deadline, poll).await.unwrap_or_else(|_| {
            warn!(
                analysis_id,
                deadline_ms = deadline.as_millis() as u64,
                "Gave up waiting for analysis"
            );
            Err(ProfilerError::timeout(
                format!("wait for analysis {analysis_id}"),
                deadline,
            ))
        })
    }
}

/// Consumes queued jobs, running at most `max_concurrency` at once.
struct AnalysisWorker {
    runner: Arc<AnalysisRunner>,
    repository: Arc<dyn AnalysisRepository>,
    receiver: mpsc::Receiver<Job>,
    shutdown: watch::Receiver<bool>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<AnalysisStatus>,
    running: HashMap<task::Id, String>,
    stats: WorkerStats,
}

impl AnalysisWorker {
    #[instrument(skip(self))]
    async fn run(mut self) -> WorkerStats {
        info!(
            max_concurrency = self.runner.config().max_concurrency(),
            "Analysis worker started"
        );

        loop {
            tokio::select! {
                job = self.receiver.recv() => match job {
                    Some(job) => self.dispatch(job).await,
                    None => {
                        debug!("All queue handles dropped");
                        break;
                    }
                },
                Some(joined) = self.tasks.join_next_with_id(), if !self.tasks.is_empty() => {
                    self.record(joined).await;
                }
                Ok(()) = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("Shutdown signal received, draining queued analyses");
                        self.receiver.close();
                        while let Some(job) = self.receiver.recv().await {
                            self.dispatch(job).await;
                        }
                        break;
                    }
                }
            }
        }

        while let Some(joined) = self.tasks.join_next_with_id().await {
            self.record(joined).await;
        }

        info!(
            "Analysis worker stopped: {} completed, {} failed, {} panicked",
            self.stats.completed, self.stats.failed, self.stats.panicked
        );
        self.stats
    }

    async fn dispatch(&mut self, job: Job) {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Worker semaphore closed");
                self.abandon(job.result, "analysis worker is shutting down").await;
                return;
            }
        };

        let analysis_id = job.result.analysis_id.clone();
        let runner = self.runner.clone();
        let repository = self.repository.clone();
        let abort = self.tasks.spawn(async move {
            let _permit = permit;
            runner
                .execute_with(job.result, job.request, Some(repository.as_ref()))
                .await
                .status
        });
        self.running.insert(abort.id(), analysis_id);
    }

    async fn record(&mut self, joined: std::result::Result<(task::Id, AnalysisStatus), JoinError>) {
        match joined {
            Ok((id, status)) => {
                self.running.remove(&id);
                match status {
                    AnalysisStatus::Completed => self.stats.completed += 1,
                    _ => self.stats.failed += 1,
                }
            }
            Err(e) => {
                self.stats.panicked += 1;
                let Some(analysis_id) = self.running.remove(&e.id()) else {
                    error!(error = %e, "Unknown analysis task failed");
                    return;
                };
                error!(analysis_id = %analysis_id, error = %e, "Analysis task panicked");
                match self.repository.get_analysis(&analysis_id).await {
                    Ok(Some(result)) => self.abandon(result, "analysis task panicked").await,
                    Ok(None) => {}
                    Err(load) => warn!(analysis_id = %analysis_id, error = %load, "Could not load analysis"),
                }
            }
        }
    }

    async fn abandon(&self, mut result: AnalysisResult, reason: &str) {
        if result.fail(reason).is_err() {
            return;
        }
        if let Err(e) = self.repository.save_analysis(&result).await {
            warn!(analysis_id = %result.analysis_id, error = %e, "Could not persist failure");
        }
    }
}
