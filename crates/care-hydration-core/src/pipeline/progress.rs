//! Progress reporting for pipeline runs.
//!
//! The pipeline reports through [`ProgressSink`]; [`ProgressStore`] is the
//! job-state map a polling front end reads from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    CarePlans,
    Hydration,
    Ipc,
    Validation,
    Dashboard,
    Csv,
    Complete,
    Failed,
}

impl Stage {
    /// Percentage reported when the stage starts.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Queued => 0,
            Stage::CarePlans => 20,
            Stage::Hydration => 40,
            Stage::Ipc => 60,
            Stage::Validation => 72,
            Stage::Dashboard => 82,
            Stage::Csv => 92,
            Stage::Complete | Stage::Failed => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Queued => "Queued",
            Stage::CarePlans => "Processing care plans",
            Stage::Hydration => "Processing hydration data",
            Stage::Ipc => "Processing IPC data",
            Stage::Validation => "Validating and cleaning data",
            Stage::Dashboard => "Generating dashboard data",
            Stage::Csv => "Generating CSV",
            Stage::Complete => "Complete",
            Stage::Failed => "Failed",
        }
    }
}

/// Receives stage transitions from a pipeline run.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: Stage);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: Stage) {}
}

/// Snapshot of one job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    fn at(job_id: Uuid, stage: Stage) -> Self {
        Self {
            job_id,
            stage,
            percent: stage.percent(),
            message: stage.label().to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Complete | Stage::Failed)
    }
}

/// Thread-safe job-state map keyed by job id.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    jobs: Arc<Mutex<HashMap<Uuid, JobProgress>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<Uuid, JobProgress>> {
        // A panicked writer leaves a complete snapshot behind
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new job in the queued state.
    pub fn create_job(&self) -> Uuid {
        let job_id = Uuid::new_v4();
        self.jobs().insert(job_id, JobProgress::at(job_id, Stage::Queued));
        job_id
    }

    pub fn update(&self, job_id: Uuid, stage: Stage) {
        self.jobs().insert(job_id, JobProgress::at(job_id, stage));
    }

    pub fn get(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs().get(&job_id).cloned()
    }

    pub fn remove(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs().remove(&job_id)
    }

    /// Sink that reports into this store for one job.
    pub fn tracker(&self, job_id: Uuid) -> JobTracker {
        JobTracker {
            store: self.clone(),
            job_id,
        }
    }
}

/// [`ProgressSink`] bound to one job of a [`ProgressStore`].
#[derive(Debug, Clone)]
pub struct JobTracker {
    store: ProgressStore,
    job_id: Uuid,
}

impl JobTracker {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }
}

impl ProgressSink for JobTracker {
    fn report(&self, stage: Stage) {
        self.store.update(self.job_id, stage);
    }
}
