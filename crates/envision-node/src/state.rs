//! Application state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use envision_engine::{EnvisionConfig, Envisionment};
use envision_scenario::Scenario;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle of an envisioning job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, waiting for the engine.
    Received,
    /// Being explored.
    Running,
    /// Finished, possibly truncated.
    Complete,
    /// Exploration failed.
    Failed,
    /// Cancelled before it finished.
    Cancelled,
}

impl JobStatus {
    /// Whether the job can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// What a cancellation request found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was waiting or running and is now cancelled.
    Cancelled,
    /// The job had already reached this terminal status.
    AlreadyFinished(JobStatus),
    /// No job with that id.
    NotFound,
}

/// Record of a job with its status and result.
#[derive(Clone)]
pub struct JobRecord {
    /// Job id.
    pub id: Uuid,

    /// Scenario to explore.
    pub scenario: Arc<Scenario>,

    /// Engine configuration for this job.
    pub config: EnvisionConfig,

    /// Current status.
    pub status: JobStatus,

    /// Result (if complete).
    pub result: Option<Arc<Envisionment>>,

    /// Error message (if failed).
    pub error: Option<String>,

    /// Submission time.
    pub created_at: DateTime<Utc>,

    /// Completion time.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Submitted jobs.
    pub jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,

    /// Configuration used when a request does not carry one.
    pub defaults: EnvisionConfig,
}

impl AppState {
    /// Create a new application state.
    pub fn new() -> Self {
        Self::with_defaults(EnvisionConfig::default())
    }

    /// Create a new application state with custom engine defaults.
    pub fn with_defaults(defaults: EnvisionConfig) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            defaults,
        }
    }

    /// Store a new job and return its id.
    pub async fn submit(&self, scenario: Scenario, config: EnvisionConfig) -> Uuid {
        let id = Uuid::new_v4();
        let record = JobRecord {
            id,
            scenario: Arc::new(scenario),
            config,
            status: JobStatus::Received,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };

        let mut jobs = self.jobs.write().await;
        jobs.insert(id, record);
        id
    }

    /// Get a job by ID.
    pub async fn get_job(&self, id: Uuid) -> Option<JobRecord> {
        let jobs = self.jobs.read().await;
        jobs.get(&id).cloned()
    }

    /// Move a waiting job to `Running` and hand out its record.
    /// Returns `None` if the job is missing or no longer waiting.
    pub async fn start(&self, id: Uuid) -> Option<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id)?;
        if record.status != JobStatus::Received {
            return None;
        }
        record.status = JobStatus::Running;
        Some(record.clone())
    }

    /// Cancel a job that has not finished.
    pub async fn cancel(&self, id: Uuid) -> CancelOutcome {
        let mut jobs = self.jobs.write().await;
        let Some(record) = jobs.get_mut(&id) else {
            return CancelOutcome::NotFound;
        };
        if record.status.is_terminal() {
            return CancelOutcome::AlreadyFinished(record.status);
        }
        record.status = JobStatus::Cancelled;
        record.finished_at = Some(Utc::now());
        CancelOutcome::Cancelled
    }

    /// Store the result of a finished job. Returns false if the job was
    /// cancelled meanwhile, in which case the result is dropped.
    pub async fn complete(&self, id: Uuid, result: Envisionment) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(record) if !record.status.is_terminal() => {
                record.result = Some(Arc::new(result));
                record.status = JobStatus::Complete;
                record.finished_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Mark a job as failed, unless it was cancelled meanwhile.
    pub async fn fail(&self, id: Uuid, error: String) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(record) if !record.status.is_terminal() => {
                record.error = Some(error);
                record.status = JobStatus::Failed;
                record.finished_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Ids of jobs waiting for the engine, oldest first.
    pub async fn received(&self) -> Vec<Uuid> {
        let jobs = self.jobs.read().await;
        let mut waiting: Vec<&JobRecord> = jobs
            .values()
            .filter(|record| record.status == JobStatus::Received)
            .collect();
        waiting.sort_by_key(|record| record.created_at);
        waiting.into_iter().map(|record| record.id).collect()
    }

    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Vec<JobRecord> {
        let jobs = self.jobs.read().await;
        let mut records: Vec<JobRecord> = jobs.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
