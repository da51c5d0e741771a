//! Bounded FIFO of ingestion jobs drained by a single background task.
//!
//! `add` validates a job and returns right away; the first accepted job
//! starts a drain task that runs jobs one at a time until the queue is empty.
//! Before every dequeue the host's rate limit is checked and the task sleeps
//! until the quota resets when it runs low.

use crate::ingestor::JobProcessor;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use repowiki_config::QueueConfig;
use repowiki_core::{Error, IngestionJob, RateLimiter, RepositoryHost};
use repowiki_db::Database;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Why a job was not accepted. The queue is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("Repository {0} is already in the queue")]
    DuplicateJob(String),

    #[error("Repository {0} has already been ingested")]
    DuplicateRepository(String),

    #[error("Queue is full ({capacity} jobs waiting)")]
    QueueFull { capacity: usize },

    #[error("Repository {0} does not exist")]
    RepositoryNotFound(String),

    #[error("Repository language {0} is not supported")]
    UnsupportedLanguage(String),

    #[error("Could not check repository: {0}")]
    HostUnavailable(String),

    #[error("Timed out checking whether {0} exists")]
    ExistenceCheckTimeout(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Tunables of the queue.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub max_queue_size: usize,
    pub rate_limit_threshold: u64,
    pub grace: Duration,
    pub existence_timeout: Duration,
    /// Empty means every language is accepted.
    pub allowed_languages: Vec<String>,
}

impl QueueSettings {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            max_queue_size: config.max_queue_size,
            rate_limit_threshold: config.rate_limit_threshold,
            grace: Duration::from_secs(config.grace_seconds),
            existence_timeout: Duration::from_secs(config.existence_check_timeout_seconds),
            allowed_languages: config.allowed_languages.clone(),
        }
    }

    fn allows_language(&self, language: &str) -> bool {
        self.allowed_languages.is_empty()
            || self
                .allowed_languages
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(language))
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Idle,
    Processing,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub status: QueueStatus,
    pub in_flight: Option<IngestionJob>,
    pub queued: Vec<IngestionJob>,
    /// Time spent on the in-flight job so far.
    pub elapsed_ms: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
}

/// `add` outcome as returned over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AddResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<String, EnqueueError>> for AddResult {
    fn from(result: Result<String, EnqueueError>) -> Self {
        match result {
            Ok(message) => Self {
                success: true,
                message: Some(message),
                error: None,
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<IngestionJob>,
    in_flight: Option<IngestionJob>,
    started_at: Option<DateTime<Utc>>,
    processing: bool,
}

/// The ingestion queue. Construct once and share the returned `Arc`.
pub struct IngestionQueue {
    db: Database,
    host: Arc<dyn RepositoryHost>,
    rate_limiter: Arc<dyn RateLimiter>,
    processor: Arc<dyn JobProcessor>,
    settings: QueueSettings,
    /// Serializes the check-then-enqueue sequence of concurrent `add` calls.
    admission: tokio::sync::Mutex<()>,
    state: Mutex<QueueState>,
    status: watch::Sender<QueueStatus>,
}

impl IngestionQueue {
    pub fn new(
        db: Database,
        host: Arc<dyn RepositoryHost>,
        rate_limiter: Arc<dyn RateLimiter>,
        processor: Arc<dyn JobProcessor>,
        settings: QueueSettings,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(QueueStatus::Idle);
        Arc::new(Self {
            db,
            host,
            rate_limiter,
            processor,
            settings,
            admission: tokio::sync::Mutex::new(()),
            state: Mutex::new(QueueState::default()),
            status,
        })
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and append a job, starting the drain task if the queue is idle.
    pub async fn add(self: &Arc<Self>, job: IngestionJob) -> Result<String, EnqueueError> {
        let _admission = self.admission.lock().await;
        let name = job.full_name();

        let duplicate = {
            let state = self.state();
            state
                .jobs
                .iter()
                .chain(state.in_flight.iter())
                .any(|queued| queued.same_repository(&job))
        };
        if duplicate {
            return Err(EnqueueError::DuplicateJob(name));
        }

        match self.db.repository_exists(&job.owner, &job.repo) {
            Ok(false) => {}
            Ok(true) => return Err(EnqueueError::DuplicateRepository(name)),
            Err(e) => return Err(EnqueueError::Storage(e.to_string())),
        }

        let waiting = self.state().jobs.len();
        if waiting >= self.settings.max_queue_size {
            return Err(EnqueueError::QueueFull {
                capacity: self.settings.max_queue_size,
            });
        }

        let check = self.host.fetch_details(&job.owner, &job.repo);
        let details = match tokio::time::timeout(self.settings.existence_timeout, check).await {
            Ok(Ok(details)) => details,
            Ok(Err(Error::RepositoryNotFound { .. })) => {
                return Err(EnqueueError::RepositoryNotFound(name))
            }
            Ok(Err(e)) => return Err(EnqueueError::HostUnavailable(e.to_string())),
            Err(_) => return Err(EnqueueError::ExistenceCheckTimeout(name)),
        };

        if let Some(language) = details.language {
            if !self.settings.allows_language(&language) {
                return Err(EnqueueError::UnsupportedLanguage(language));
            }
        }

        let (start, waiting) = {
            let mut state = self.state();
            state.jobs.push_back(job);
            let start = !state.processing;
            if start {
                state.processing = true;
                self.status.send_replace(QueueStatus::Processing);
            }
            (start, state.jobs.len())
        };
        info!("Queued {} ({} waiting)", name, waiting);

        if start {
            let queue = Arc::clone(self);
            tokio::spawn(async move { queue.drain().await });
        }

        Ok(format!("Repository {} loaded into queue", name))
    }

    async fn drain(self: Arc<Self>) {
        info!("Queue processing started");
        loop {
            {
                let mut state = self.state();
                if state.jobs.is_empty() {
                    state.processing = false;
                    self.status.send_replace(QueueStatus::Idle);
                    break;
                }
            }

            match self.rate_limiter.check().await {
                Ok(limit) if limit.remaining < self.settings.rate_limit_threshold => {
                    // Reset times are whole epoch seconds; round up so no job starts early
                    let until_reset = (limit.reset_at - Utc::now()).to_std().unwrap_or_default();
                    let wait = Duration::from_secs(
                        until_reset.as_secs() + u64::from(until_reset.subsec_nanos() > 0),
                    ) + self.settings.grace;
                    warn!(
                        "Rate limit low ({} requests left), waiting {}s before the next job",
                        limit.remaining,
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Ok(_) => {}
                Err(e) => warn!("Rate limit check failed, continuing: {}", e),
            }

            let job = {
                let mut state = self.state();
                let Some(job) = state.jobs.pop_front() else {
                    continue;
                };
                state.in_flight = Some(job.clone());
                state.started_at = Some(Utc::now());
                job
            };

            info!("Processing {}", job);
            match AssertUnwindSafe(self.processor.process(&job)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Failed to process {}: {}", job, e),
                Err(panic) => error!("Processing {} panicked: {}", job, panic_message(&*panic)),
            }

            {
                let mut state = self.state();
                state.in_flight = None;
                state.started_at = None;
            }
        }
        info!("Queue processing finished");
    }

    /// Current jobs and timing.
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.state();
        QueueSnapshot {
            status: if state.processing {
                QueueStatus::Processing
            } else {
                QueueStatus::Idle
            },
            in_flight: state.in_flight.clone(),
            queued: state.jobs.iter().cloned().collect(),
            elapsed_ms: state
                .started_at
                .map(|started| (Utc::now() - started).num_milliseconds()),
            started_at: state.started_at,
        }
    }

    /// Resolves once every accepted job has been processed.
    pub async fn wait_idle(&self) {
        let mut status = self.status.subscribe();
        let _ = status.wait_for(|s| *s == QueueStatus::Idle).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestError, IngestResult};
    use crate::testing::{seeded_db, FakeHost, FakeRateLimiter};
    use async_trait::async_trait;
    use repowiki_core::RateLimitStatus;
    use tokio::sync::{mpsc, Semaphore};
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingProcessor {
        processed: Mutex<Vec<(String, Instant)>>,
        fail_on: Option<String>,
        panic_on: Option<String>,
        gate: Option<(Arc<Semaphore>, mpsc::UnboundedSender<String>)>,
    }

    impl RecordingProcessor {
        fn names(&self) -> Vec<String> {
            self.processed
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
    }

    #[async_trait]
    impl JobProcessor for RecordingProcessor {
        async fn process(&self, job: &IngestionJob) -> IngestResult<()> {
            if let Some((gate, started)) = &self.gate {
                started.send(job.full_name()).unwrap();
                gate.acquire().await.unwrap().forget();
            }
            self.processed
                .lock()
                .unwrap()
                .push((job.full_name(), Instant::now()));
            if self.panic_on.as_deref() == Some(job.full_name().as_str()) {
                panic!("processor crashed on {}", job);
            }
            if self.fail_on.as_deref() == Some(job.full_name().as_str()) {
                return Err(IngestError::ProcessingError("boom".to_string()));
            }
            Ok(())
        }
    }

    fn settings(max_queue_size: usize) -> QueueSettings {
        QueueSettings {
            max_queue_size,
            rate_limit_threshold: 500,
            grace: Duration::from_secs(1),
            existence_timeout: Duration::from_secs(10),
            allowed_languages: vec!["TypeScript".to_string(), "Rust".to_string()],
        }
    }

    fn host(repos: &[&str]) -> FakeHost {
        repos.iter().fold(FakeHost::new(), |host, repo| {
            host.with_repository("octo", repo, Some("Rust"))
        })
    }

    fn queue(
        db: Database,
        host: FakeHost,
        limiter: Arc<FakeRateLimiter>,
        processor: Arc<RecordingProcessor>,
        max_queue_size: usize,
    ) -> Arc<IngestionQueue> {
        IngestionQueue::new(db, Arc::new(host), limiter, processor, settings(max_queue_size))
    }

    fn empty_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_capacity_and_duplicates() {
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let processor = Arc::new(RecordingProcessor {
            gate: Some((gate.clone(), started_tx)),
            ..Default::default()
        });
        let q = queue(
            empty_db(),
            host(&["a", "b", "c", "d"]),
            FakeRateLimiter::unlimited(),
            processor.clone(),
            2,
        );

        q.add(IngestionJob::new("octo", "a")).await.unwrap();
        assert_eq!(started_rx.recv().await.unwrap(), "octo/a");

        q.add(IngestionJob::new("octo", "b")).await.unwrap();
        q.add(IngestionJob::new("octo", "c")).await.unwrap();

        // In flight and queued jobs both count as duplicates
        assert_eq!(
            q.add(IngestionJob::new("octo", "a")).await,
            Err(EnqueueError::DuplicateJob("octo/a".to_string()))
        );
        assert_eq!(
            q.add(IngestionJob::new("octo", "b")).await,
            Err(EnqueueError::DuplicateJob("octo/b".to_string()))
        );
        assert_eq!(
            q.add(IngestionJob::new("Octo", "B")).await,
            Err(EnqueueError::DuplicateJob("Octo/B".to_string()))
        );
        assert_eq!(
            q.add(IngestionJob::new("octo", "d")).await,
            Err(EnqueueError::QueueFull { capacity: 2 })
        );

        let snapshot = q.snapshot();
        assert_eq!(snapshot.status, QueueStatus::Processing);
        assert_eq!(snapshot.in_flight.unwrap().repo, "a");
        assert_eq!(snapshot.queued.len(), 2);
        assert!(snapshot.started_at.is_some());

        gate.add_permits(3);
        q.wait_idle().await;
        assert_eq!(processor.names(), vec!["octo/a", "octo/b", "octo/c"]);
        assert_eq!(q.snapshot().status, QueueStatus::Idle);
    }

    #[tokio::test]
    async fn test_jobs_run_in_order_past_failures() {
        let processor = Arc::new(RecordingProcessor {
            fail_on: Some("octo/bad".to_string()),
            ..Default::default()
        });
        let q = queue(
            empty_db(),
            host(&["first", "bad", "last"]),
            FakeRateLimiter::unlimited(),
            processor.clone(),
            25,
        );

        for repo in ["first", "bad", "last"] {
            q.add(IngestionJob::new("octo", repo)).await.unwrap();
        }
        q.wait_idle().await;

        assert_eq!(processor.names(), vec!["octo/first", "octo/bad", "octo/last"]);
        let snapshot = q.snapshot();
        assert!(snapshot.in_flight.is_none() && snapshot.queued.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_queue() {
        let processor = Arc::new(RecordingProcessor {
            panic_on: Some("octo/bad".to_string()),
            ..Default::default()
        });
        let q = queue(
            empty_db(),
            host(&["bad", "good"]),
            FakeRateLimiter::unlimited(),
            processor.clone(),
            25,
        );

        q.add(IngestionJob::new("octo", "bad")).await.unwrap();
        q.add(IngestionJob::new("octo", "good")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), q.wait_idle())
            .await
            .expect("queue should drain after a panicking job");

        assert_eq!(processor.names(), vec!["octo/good"]);
        let snapshot = q.snapshot();
        assert_eq!(snapshot.status, QueueStatus::Idle);
        assert!(snapshot.in_flight.is_none());
        assert!(snapshot.started_at.is_none());

        // The queue accepts and runs work again afterwards
        q.add(IngestionJob::new("octo", "bad")).await.unwrap();
        q.wait_idle().await;
        assert!(q.snapshot().in_flight.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_respect_capacity() {
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let processor = Arc::new(RecordingProcessor {
            gate: Some((gate.clone(), started_tx)),
            ..Default::default()
        });
        let repos = ["a", "b", "c", "d", "e", "f", "g"];
        let q = queue(
            empty_db(),
            host(&repos),
            FakeRateLimiter::unlimited(),
            processor.clone(),
            2,
        );

        q.add(IngestionJob::new("octo", "a")).await.unwrap();
        assert_eq!(started_rx.recv().await.unwrap(), "octo/a");

        // Every remaining repository is requested twice at the same time
        let handles: Vec<_> = repos[1..]
            .iter()
            .chain(repos[1..].iter())
            .map(|repo| {
                let q = Arc::clone(&q);
                let job = IngestionJob::new("octo", *repo);
                tokio::spawn(async move { (job.full_name(), q.add(job).await) })
            })
            .collect();

        let mut accepted = Vec::new();
        for handle in handles {
            let (name, result) = handle.await.unwrap();
            match result {
                Ok(_) => accepted.push(name),
                Err(EnqueueError::DuplicateJob(_)) | Err(EnqueueError::QueueFull { .. }) => {}
                Err(other) => panic!("unexpected rejection: {}", other),
            }
        }

        let snapshot = q.snapshot();
        assert!(snapshot.queued.len() <= 2);
        assert_eq!(accepted.len(), 2);
        accepted.sort();
        accepted.dedup();
        assert_eq!(accepted.len(), 2);
        let mut queued: Vec<String> = snapshot.queued.iter().map(|j| j.full_name()).collect();
        queued.sort();
        assert_eq!(queued, accepted);

        gate.add_permits(3);
        q.wait_idle().await;
        assert_eq!(processor.names().len(), 3);
    }

    #[tokio::test]
    async fn test_rejections_leave_queue_untouched() {
        let (db, _) = seeded_db();
        let host = FakeHost::new()
            .with_repository("octo", "wiki", Some("TypeScript"))
            .with_repository("octo", "legacy", Some("COBOL"));
        let processor = Arc::new(RecordingProcessor::default());
        let q = queue(db, host, FakeRateLimiter::unlimited(), processor.clone(), 25);

        assert_eq!(
            q.add(IngestionJob::new("octo", "wiki")).await,
            Err(EnqueueError::DuplicateRepository("octo/wiki".to_string()))
        );
        assert_eq!(
            q.add(IngestionJob::new("octo", "missing")).await,
            Err(EnqueueError::RepositoryNotFound("octo/missing".to_string()))
        );
        assert_eq!(
            q.add(IngestionJob::new("octo", "legacy")).await,
            Err(EnqueueError::UnsupportedLanguage("COBOL".to_string()))
        );

        let snapshot = q.snapshot();
        assert_eq!(snapshot.status, QueueStatus::Idle);
        assert!(snapshot.queued.is_empty());
        assert!(processor.names().is_empty());
    }

    #[tokio::test]
    async fn test_repository_without_language_is_accepted() {
        let host = FakeHost::new().with_repository("octo", "docs", None);
        let processor = Arc::new(RecordingProcessor::default());
        let q = queue(empty_db(), host, FakeRateLimiter::unlimited(), processor.clone(), 25);

        let message = q.add(IngestionJob::new("octo", "docs")).await.unwrap();
        assert_eq!(message, "Repository octo/docs loaded into queue");
        q.wait_idle().await;
        assert_eq!(processor.names(), vec!["octo/docs"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_existence_check_times_out() {
        let host = host(&["slow"]).with_details_delay(Duration::from_secs(30));
        let q = queue(
            empty_db(),
            host,
            FakeRateLimiter::unlimited(),
            Arc::new(RecordingProcessor::default()),
            25,
        );

        assert_eq!(
            q.add(IngestionJob::new("octo", "slow")).await,
            Err(EnqueueError::ExistenceCheckTimeout("octo/slow".to_string()))
        );
        assert!(q.snapshot().queued.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_rate_limit_delays_next_job() {
        let limiter = FakeRateLimiter::scripted(vec![Some(RateLimitStatus {
            remaining: 10,
            reset_at: Utc::now() + chrono::Duration::seconds(5),
        })]);
        let processor = Arc::new(RecordingProcessor::default());
        let q = queue(empty_db(), host(&["a"]), limiter.clone(), processor.clone(), 25);

        let enqueued = Instant::now();
        q.add(IngestionJob::new("octo", "a")).await.unwrap();
        q.wait_idle().await;

        let processed = processor.processed.lock().unwrap().clone();
        assert_eq!(processed.len(), 1);
        // Reset in 5s plus 1s grace
        assert!(processed[0].1 - enqueued >= Duration::from_secs(6));
        // The low reading, then the re-check after sleeping
        assert_eq!(limiter.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_rate_limit_check_does_not_block() {
        let limiter = FakeRateLimiter::scripted(vec![None]);
        let processor = Arc::new(RecordingProcessor::default());
        let q = queue(empty_db(), host(&["a"]), limiter.clone(), processor.clone(), 25);

        q.add(IngestionJob::new("octo", "a")).await.unwrap();
        q.wait_idle().await;

        assert_eq!(processor.names(), vec!["octo/a"]);
        assert_eq!(limiter.calls(), 1);
    }

    #[test]
    fn test_add_result_shape() {
        let ok = AddResult::from(Ok("Repository octo/a loaded into queue".to_string()));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"success": true, "message": "Repository octo/a loaded into queue"})
        );

        let err = AddResult::from(Err(EnqueueError::QueueFull { capacity: 25 }));
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("Queue is full (25 jobs waiting)"));
    }

    #[test]
    fn test_language_allow_list() {
        let mut settings = settings(1);
        assert!(settings.allows_language("rust"));
        assert!(!settings.allows_language("Haskell"));

        settings.allowed_languages.clear();
        assert!(settings.allows_language("Haskell"));
    }
}
