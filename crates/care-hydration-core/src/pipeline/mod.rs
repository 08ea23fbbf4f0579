//! Orchestrator: care plans → hydration → IPC → validate → dashboards → CSV.
//!
//! Stages run strictly in order. A file that fails to parse becomes an entry
//! in `errors` and the batch continues; only an empty care-plan roster stops
//! the run.

mod log;
mod progress;

pub use log::*;
pub use progress::*;

use std::collections::HashSet;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::info_span;

use crate::careplan::process_care_plans;
use crate::config::PipelineConfig;
use crate::dashboard::{generate_dashboard_data, validate_and_clean_data};
use crate::export::generate_csv_content;
use crate::hydration::process_hydration_files;
use crate::ipc::process_ipc_data;
use crate::models::{DashboardData, FileInput, ResidentWithIpc};
use crate::pdf::PageExtractor;

/// Pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No residents extracted from care plans")]
    NoResidents,

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Input files grouped by document kind.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub care_plans: Vec<FileInput>,
    pub hydration: Vec<FileInput>,
    pub ipc: Vec<FileInput>,
}

/// Outcome of one run. Partial results come with their errors and warnings.
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    pub residents: Vec<ResidentWithIpc>,
    pub dashboard_data: Vec<DashboardData>,
    pub csv_data: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProcessingResult {
    fn failed(log: RunLog) -> Self {
        let (errors, warnings) = log.into_parts();
        Self {
            errors,
            warnings,
            ..Self::default()
        }
    }

    /// True when at least one dashboard was produced.
    pub fn has_dashboards(&self) -> bool {
        !self.dashboard_data.is_empty()
    }
}

/// Keep the first of each set of byte-identical files.
fn unique_files(files: &[FileInput], kind: &str, log: &mut RunLog) -> Vec<FileInput> {
    let mut seen = HashSet::new();
    files
        .iter()
        .filter(|file| {
            let first = seen.insert(file.fingerprint());
            if !first {
                log.warn(format!(
                    "Skipping duplicate {} upload {} (identical content already processed)",
                    kind, file.file_name
                ));
            }
            first
        })
        .cloned()
        .collect()
}

/// Runs the full reconciliation.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    extractor: &'a dyn PageExtractor,
    progress: &'a dyn ProgressSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, extractor: &'a dyn PageExtractor) -> Self {
        Self {
            config,
            extractor,
            progress: &NoProgress,
        }
    }

    /// Report stage transitions to `progress`.
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Process every input. `now` stamps the artifacts and anchors undated logs.
    pub fn process_files(&self, inputs: &PipelineInputs, now: NaiveDateTime) -> ProcessingResult {
        let _span = info_span!(
            "process_files",
            care_plans = inputs.care_plans.len(),
            hydration = inputs.hydration.len(),
            ipc = inputs.ipc.len()
        )
        .entered();

        let mut log = RunLog::new();

        log.info("Step 1: Processing care plan PDFs...");
        self.progress.report(Stage::CarePlans);
        let care_plans = unique_files(&inputs.care_plans, "care plan", &mut log);
        let roster = process_care_plans(&care_plans, self.extractor, self.config, &mut log);
        if roster.is_empty() {
            log.error(PipelineError::NoResidents.to_string());
            self.progress.report(Stage::Failed);
            return ProcessingResult::failed(log);
        }
        log.info(format!("Found {} residents in care plans", roster.len()));

        log.info("Step 2: Processing hydration data PDFs...");
        self.progress.report(Stage::Hydration);
        let hydration = unique_files(&inputs.hydration, "hydration", &mut log);
        let records = process_hydration_files(
            &hydration,
            roster,
            self.extractor,
            self.config,
            now.date(),
            &mut log,
        );

        log.info("Step 3: Processing IPC data...");
        self.progress.report(Stage::Ipc);
        let ipc = unique_files(&inputs.ipc, "IPC", &mut log);
        let residents = process_ipc_data(records, &ipc, &mut log);

        log.info("Step 4: Validating and cleaning data...");
        self.progress.report(Stage::Validation);
        let residents = validate_and_clean_data(
            residents,
            &self.config.invalid_keywords,
            self.config.missed_days_window,
            &mut log,
        );

        log.info("Step 5: Generating dashboard data...");
        self.progress.report(Stage::Dashboard);
        let dashboard_data = generate_dashboard_data(&residents, now, &mut log);

        log.info("Step 6: Generating CSV...");
        self.progress.report(Stage::Csv);
        let csv_data = generate_csv_content(&residents);

        log.info(format!(
            "Processing complete: {} residents, {} dashboards",
            residents.len(),
            dashboard_data.len()
        ));
        self.progress.report(Stage::Complete);

        let (errors, warnings) = log.into_parts();
        ProcessingResult {
            residents,
            dashboard_data,
            csv_data,
            errors,
            warnings,
        }
    }
}

/// Run the pipeline with default progress handling.
pub fn process_files(
    inputs: &PipelineInputs,
    extractor: &dyn PageExtractor,
    config: &PipelineConfig,
    now: NaiveDateTime,
) -> ProcessingResult {
    Pipeline::new(config, extractor).process_files(inputs, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PlainTextExtractor;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_roster_aborts() {
        let inputs = PipelineInputs {
            care_plans: vec![FileInput::new("plan.pdf", "no residents here")],
            hydration: vec![FileInput::new(
                "hydration_10-01-2026.pdf",
                "Resident Name: JANE DOE Resident Location: 2W\nTotal By Day 900.0",
            )],
            ..PipelineInputs::default()
        };

        let store = ProgressStore::new();
        let job = store.create_job();
        let tracker = store.tracker(job);
        let config = PipelineConfig::default();
        let result = Pipeline::new(&config, &PlainTextExtractor)
            .with_progress(&tracker)
            .process_files(&inputs, now());

        assert!(result.residents.is_empty());
        assert!(!result.has_dashboards());
        assert!(result.csv_data.is_empty());
        assert_eq!(result.errors, vec!["No residents extracted from care plans"]);
        assert_eq!(store.get(job).unwrap().stage, Stage::Failed);
    }

    #[test]
    fn test_bad_file_is_isolated() {
        let inputs = PipelineInputs {
            care_plans: vec![
                FileInput::new("broken.pdf", vec![0xff, 0xfe, 0x00]),
                FileInput::new("plan.pdf", "Doe, Jane (1234)\nFLUID TARGET 1500mL"),
            ],
            ..PipelineInputs::default()
        };

        let config = PipelineConfig::default();
        let result = process_files(&inputs, &PlainTextExtractor, &config, now());

        assert_eq!(result.residents.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Error processing broken.pdf"));
    }

    #[test]
    fn test_duplicate_uploads_skipped() {
        let plan = "Doe, Jane (1234)\nFLUID TARGET 1500mL";
        let log_page = "Resident Name: JANE DOE Resident Location: 2W\nTotal By Day 900.0";
        let inputs = PipelineInputs {
            care_plans: vec![FileInput::new("plan.pdf", plan), FileInput::new("plan copy.pdf", plan)],
            hydration: vec![
                FileInput::new("hydration_10-01-2026.pdf", log_page),
                FileInput::new("extra_10-01-2026.pdf", log_page),
            ],
            ..PipelineInputs::default()
        };

        let config = PipelineConfig::default();
        let result = process_files(&inputs, &PlainTextExtractor, &config, now());

        let duplicates: Vec<_> = result
            .warnings
            .iter()
            .filter(|w| w.starts_with("Skipping duplicate"))
            .collect();
        assert_eq!(duplicates.len(), 2);

        // The repeated log was not added on top of the first
        let jane = &result.residents[0];
        assert_eq!(jane.date_data.values().copied().collect::<Vec<_>>(), vec![900.0]);
    }

    #[test]
    fn test_progress_reaches_complete() {
        let inputs = PipelineInputs {
            care_plans: vec![FileInput::new("plan.pdf", "Doe, Jane (1234)\nFLUID TARGET 1500mL")],
            ..PipelineInputs::default()
        };

        let store = ProgressStore::new();
        let job = store.create_job();
        let tracker = store.tracker(job);
        let config = PipelineConfig::default();
        let result = Pipeline::new(&config, &PlainTextExtractor)
            .with_progress(&tracker)
            .process_files(&inputs, now());

        let progress = store.get(job).unwrap();
        assert_eq!(progress.percent, 100);
        assert!(progress.is_finished());
        // No hydration data, so no reporting days
        assert!(!result.has_dashboards());
        assert!(result.warnings.iter().any(|w| w == "No date columns found!"));
    }
}
