//! Care-Hydration Core Library
//!
//! Reconciles care plans, hydration logs and infection-control sheets into one
//! per-resident record and renders per-date hydration dashboards for a care home.
//!
//! # Architecture
//!
//! ```text
//! Care-plan PDFs ──► Care-Plan Extractor ──► roster (name, mL goal, feeding tube)
//!                                                     │
//! Hydration PDFs ──► Hydration Extractor ─── name matching ──► daily totals, missed 3 days
//!                                                     │
//! IPC CSVs ────────► IPC Merger ──────────── name matching ──► infection fields
//!                                                     │
//!                                        Validator (merge duplicates)
//!                                                     │
//!                             ┌───────────────────────┼───────────────────────┐
//!                             │                       │                       │
//!                             ▼                       ▼                       ▼
//!                     dashboard_<date>.js      hydration_goals.csv     SQLite archive
//! ```
//!
//! # Core Principle
//!
//! **Identity is re-resolved at every join.** A resident is a fuzzy equivalence
//! class of names, never a primary key; unresolved names are reported, never guessed.
//!
//! # Modules
//!
//! - [`pdf`]: Per-page text extraction behind the [`PageExtractor`] seam
//! - [`names`]: Name normalization and the ordered match strategies
//! - [`careplan`]: Resident, fluid target and feeding-tube extraction
//! - [`hydration`]: Daily consumption and the missed-days flag
//! - [`ipc`]: Infection-control CSV merge
//! - [`dashboard`]: Validation and per-date dashboards
//! - [`export`]: JS and CSV artifacts
//! - [`pipeline`]: Orchestration, run log and job progress
//! - [`db`]: Dashboard archive

pub mod careplan;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod export;
pub mod hydration;
pub mod ipc;
pub mod models;
pub mod names;
pub mod pdf;
pub mod pipeline;

// Re-export commonly used types
pub use config::{DateSource, PipelineConfig};
pub use db::{ArchivedDashboard, Database};
pub use models::{
    CarePlanResident, DashboardData, DashboardResident, FileInput, HydrationRecord,
    ResidentWithIpc, YesNo,
};
pub use names::{find_matching_resident, NameIndex, NameMatcher};
pub use pdf::{DocumentExtractor, PageExtractor, PdfTextExtractor, PlainTextExtractor};
pub use pipeline::{
    process_files, JobProgress, Pipeline, PipelineInputs, ProcessingResult, ProgressStore, Stage,
};

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

// =========================================================================
// Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum HydrationError {
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] pdf::ExtractionError),

    #[error("IPC error: {0}")]
    Ipc(#[from] ipc::IpcError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl<T> From<std::sync::PoisonError<T>> for HydrationError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        HydrationError::Lock(e.to_string())
    }
}

pub type HydrationResult<T> = Result<T, HydrationError>;

// =========================================================================
// Main API Object
// =========================================================================

/// A finished run for one home.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub job_id: Uuid,
    /// Final job state; the job is no longer held by the progress store
    pub progress: Option<JobProgress>,
    /// URL-safe home identifier, see [`export::home_identifier`]
    pub home_id: String,
    pub result: ProcessingResult,
}

/// Pipeline runner with a shared dashboard archive and job-progress store.
pub struct HydrationCore {
    archive: Arc<Mutex<Database>>,
    progress: ProgressStore,
    config: PipelineConfig,
}

impl HydrationCore {
    /// Open or create the archive at the given path.
    pub fn open<P: AsRef<Path>>(path: P, config: PipelineConfig) -> HydrationResult<Self> {
        Ok(Self::with_database(Database::open(path)?, config))
    }

    /// In-memory archive (for testing).
    pub fn open_in_memory(config: PipelineConfig) -> HydrationResult<Self> {
        Ok(Self::with_database(Database::open_in_memory()?, config))
    }

    fn with_database(db: Database, config: PipelineConfig) -> Self {
        Self {
            archive: Arc::new(Mutex::new(db)),
            progress: ProgressStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Job states for polling.
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Run the pipeline for a home and archive every dashboard it produced.
    pub fn run(
        &self,
        home_name: &str,
        inputs: &PipelineInputs,
        extractor: &dyn PageExtractor,
        now: NaiveDateTime,
    ) -> HydrationResult<RunOutcome> {
        let job_id = self.progress.create_job();
        let tracker = self.progress.tracker(job_id);
        let home_id = export::home_identifier(home_name);
        info!(%job_id, home = %home_id, "starting hydration run");

        let result = Pipeline::new(&self.config, extractor)
            .with_progress(&tracker)
            .process_files(inputs, now);

        let archived = self.archive_dashboards(&home_id, &result);
        let progress = self.progress.remove(job_id);
        archived?;

        Ok(RunOutcome {
            job_id,
            progress,
            home_id,
            result,
        })
    }

    fn archive_dashboards(&self, home_id: &str, result: &ProcessingResult) -> HydrationResult<()> {
        let db = self.archive.lock()?;
        for dashboard in &result.dashboard_data {
            let content = export::generate_js_file_content(dashboard, self.config.dashboard_indent)?;
            db.save_dashboard(home_id, dashboard, &content)?;
        }
        Ok(())
    }

    /// Write a run's artifacts under `base_dir/files/hydration/<home-id>/`.
    pub fn publish(
        &self,
        home_name: &str,
        outcome: &RunOutcome,
        base_dir: &Path,
    ) -> HydrationResult<export::SavedFiles> {
        Ok(export::save_dashboard_to_files(
            &outcome.result.dashboard_data,
            &outcome.result.residents,
            home_name,
            base_dir,
            self.config.dashboard_indent,
        )?)
    }

    /// Archived dashboards for a home, by reporting date.
    pub fn archived_dashboards(&self, home_name: &str) -> HydrationResult<Vec<ArchivedDashboard>> {
        let db = self.archive.lock()?;
        Ok(db.list_dashboards(&export::home_identifier(home_name))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn inputs() -> PipelineInputs {
        PipelineInputs {
            care_plans: vec![FileInput::new(
                "plan.pdf",
                "Doe, Jane (1234)\nFLUID TARGET 1500mL",
            )],
            hydration: vec![FileInput::new(
                "hydration_10-01-2026.pdf",
                "Resident Name: JANE DOE Resident Location: 2W\nTotal By Day 900.0 1600.0",
            )],
            ipc: Vec::new(),
        }
    }

    #[test]
    fn test_run_archives_dashboards() {
        let core = HydrationCore::open_in_memory(PipelineConfig::default()).unwrap();
        let outcome = core.run("Cedar Grove", &inputs(), &PlainTextExtractor, now()).unwrap();

        assert_eq!(outcome.home_id, "cedar-grove");
        assert_eq!(outcome.result.dashboard_data.len(), 2);
        assert_eq!(outcome.progress.as_ref().unwrap().stage, Stage::Complete);
        assert!(core.progress().get(outcome.job_id).is_none());

        let archived = core.archived_dashboards("Cedar Grove").unwrap();
        assert_eq!(archived.len(), 2);
        assert_eq!(archived[0].dashboard.date_key, "10_01_2026");

        // Same dates again: replaced, not appended
        core.run("Cedar Grove", &inputs(), &PlainTextExtractor, now()).unwrap();
        assert_eq!(core.archived_dashboards("Cedar Grove").unwrap().len(), 2);
    }

    #[test]
    fn test_finished_jobs_leave_store() {
        let core = HydrationCore::open_in_memory(PipelineConfig::default()).unwrap();
        let ids: Vec<Uuid> = (0..3)
            .map(|_| core.run("Cedar Grove", &inputs(), &PlainTextExtractor, now()).unwrap().job_id)
            .collect();

        assert!(ids.iter().all(|id| core.progress().get(*id).is_none()));
    }

    #[test]
    fn test_publish_writes_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let core = HydrationCore::open_in_memory(PipelineConfig::default()).unwrap();
        let outcome = core.run("Cedar Grove", &inputs(), &PlainTextExtractor, now()).unwrap();

        let saved = core.publish("Cedar Grove", &outcome, tmp.path()).unwrap();
        assert_eq!(saved.files.len(), 3);
        assert!(saved.directory.ends_with("files/hydration/cedar-grove"));
    }
}
