//! Artifact files under `files/hydration/<home-id>/`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{DashboardData, ResidentWithIpc};
use tracing::info;

use crate::pipeline::{PipelineError, PipelineResult};

use super::{generate_csv_content, generate_js_file_content};

/// Roster CSV written next to the dashboards.
pub const CSV_FILE_NAME: &str = "hydration_goals.csv";

/// URL-safe home identifier, e.g. "Cedar Grove" → "cedar-grove".
pub fn home_identifier(home_name: &str) -> String {
    home_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Output directory for a home.
pub fn home_output_dir(base_dir: &Path, home_name: &str) -> PathBuf {
    base_dir
        .join("files")
        .join("hydration")
        .join(home_identifier(home_name))
}

/// Paths written by [`save_dashboard_to_files`].
#[derive(Debug, Clone)]
pub struct SavedFiles {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

fn write(path: &Path, content: &str) -> PipelineResult<()> {
    fs::write(path, content).map_err(|source| PipelineError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Write every dashboard and the roster CSV, replacing earlier artifacts of the same date.
pub fn save_dashboard_to_files(
    dashboards: &[DashboardData],
    residents: &[ResidentWithIpc],
    home_name: &str,
    base_dir: &Path,
    indent: usize,
) -> PipelineResult<SavedFiles> {
    let directory = home_output_dir(base_dir, home_name);
    if !directory.exists() {
        fs::create_dir_all(&directory).map_err(|source| PipelineError::Io {
            path: directory.display().to_string(),
            source,
        })?;
        info!(directory = %directory.display(), "Created directory");
    }

    let mut files = Vec::new();

    for dashboard in dashboards {
        let path = directory.join(dashboard.file_name());
        write(&path, &generate_js_file_content(dashboard, indent)?)?;
        info!(
            file = %dashboard.file_name(),
            residents = dashboard.resident_count(),
            "Saved dashboard"
        );
        files.push(path);
    }

    if !residents.is_empty() {
        let path = directory.join(CSV_FILE_NAME);
        write(&path, &generate_csv_content(residents))?;
        info!(file = CSV_FILE_NAME, residents = residents.len(), "Saved roster CSV");
        files.push(path);
    }

    info!(files = files.len(), directory = %directory.display(), "Saved artifacts");
    Ok(SavedFiles { directory, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarePlanResident, HydrationRecord};

    #[test]
    fn test_home_identifier() {
        assert_eq!(home_identifier("Cedar Grove"), "cedar-grove");
        assert_eq!(home_identifier("St. Mary's  Home"), "st-marys-home");
        assert_eq!(home_identifier("Unit 4B"), "unit-4b");
    }

    #[test]
    fn test_save_and_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let dashboard = DashboardData {
            date_key: "10_01_2026".to_string(),
            date_display: "10/01/2026".to_string(),
            generated_at: "2026-10-14 09:30:00".to_string(),
            residents: Vec::new(),
        };
        let residents: Vec<ResidentWithIpc> =
            vec![HydrationRecord::from(CarePlanResident::new("Doe, Jane", "plan.pdf - Page 1")).into()];

        let saved =
            save_dashboard_to_files(&[dashboard.clone()], &residents, "Cedar Grove", tmp.path(), 12)
                .unwrap();

        assert_eq!(saved.directory, tmp.path().join("files/hydration/cedar-grove"));
        assert_eq!(saved.files.len(), 2);
        assert!(saved.directory.join("dashboard_10_01_2026.js").exists());
        assert!(saved.directory.join(CSV_FILE_NAME).exists());

        let again = save_dashboard_to_files(&[dashboard], &[], "Cedar Grove", tmp.path(), 12).unwrap();
        assert_eq!(again.files.len(), 1);
        let entries = fs::read_dir(&saved.directory).unwrap().count();
        assert_eq!(entries, 2);
    }
}
