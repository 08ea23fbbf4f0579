//! Dashboard output rows.

use serde::{Deserialize, Serialize};

/// String flag rendered as "yes" / "no" in dashboard artifacts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "yes",
            YesNo::No => "no",
        }
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value {
            YesNo::Yes
        } else {
            YesNo::No
        }
    }
}

/// One row of a dashboard artifact.
///
/// Field order is the order the dashboard front end reads; serde emits
/// struct fields in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardResident {
    pub name: String,
    pub goal: f64,
    pub source: String,
    #[serde(rename = "missed3Days")]
    pub missed_3_days: YesNo,
    pub data: f64,
    pub ipc_found: YesNo,
    pub infection: String,
    pub infection_type: String,
}

/// Dashboard for a single reporting date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardData {
    /// Date in MM_DD_YYYY form, used for file names and archive keys
    pub date_key: String,
    /// Date in MM/DD/YYYY form
    pub date_display: String,
    /// Generation timestamp, "YYYY-MM-DD HH:MM:SS"
    pub generated_at: String,
    pub residents: Vec<DashboardResident>,
}

impl DashboardData {
    pub fn resident_count(&self) -> usize {
        self.residents.len()
    }

    /// Artifact file name, e.g. `dashboard_10_16_2025.js`.
    pub fn file_name(&self) -> String {
        format!("dashboard_{}.js", self.date_key)
    }
}
