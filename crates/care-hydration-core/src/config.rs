//! Pipeline configuration.
//!
//! Every heuristic constant the extractors depend on lives here so a home
//! with unusual documents can be tuned from a TOML file instead of a rebuild.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Pages scanned ahead of a name-only care-plan page for its fluid target.
pub const DEFAULT_FORWARD_SEARCH_PAGES: usize = 20;

/// Consecutive below-goal days that raise the missed flag.
pub const DEFAULT_MISSED_DAYS_WINDOW: usize = 3;

/// Which evidence anchors the first reporting day of a hydration log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    /// A date token in the file name wins over the page's "Start Date"
    #[default]
    Filename,
    /// The page's "Start Date" wins over the file name
    Content,
}

/// Tunables for the extraction and validation stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub forward_search_pages: usize,
    pub missed_days_window: usize,
    /// Phrases that disqualify a care-plan name candidate (document headers)
    pub skip_phrases: Vec<String>,
    /// Keywords that mark a validated entry as heading noise
    pub invalid_keywords: Vec<String>,
    pub date_source: DateSource,
    /// Spaces per indentation level in the generated JS artifact
    pub dashboard_indent: usize,
    /// Search every page for residents still lacking a target after the per-page pass
    pub comprehensive_sweep: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forward_search_pages: DEFAULT_FORWARD_SEARCH_PAGES,
            missed_days_window: DEFAULT_MISSED_DAYS_WINDOW,
            skip_phrases: to_strings(&[
                "Admission Date",
                "Facility",
                "Location",
                "Print Date",
                "Admissiondate",
                "Delusional",
                "Disorder",
            ]),
            invalid_keywords: to_strings(&[
                "admission",
                "admissiondate",
                "delusional",
                "delusions",
                "threatening",
                "bowel",
                "disorder",
                "stroke",
                "lacunar",
                "resisting",
                "fracture",
                "anxiety",
                "acute pain",
                "degeneration",
                "potential",
                "daily",
                "boost",
                "carb",
                "smart",
                "once",
                "corticobasal",
                "ganglia",
                "physician",
                "location",
                "unspecified",
                "meeting",
                "independence",
                "inability",
                "medical",
                "diagnoses",
            ]),
            date_source: DateSource::default(),
            dashboard_indent: 12,
            comprehensive_sweep: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a file, or fall back to defaults if it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
