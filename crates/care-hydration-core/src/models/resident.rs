//! Resident records as they move through the pipeline stages.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder for absent infection fields.
pub const NO_INFECTION: &str = "-";

/// A resident as extracted from a care-plan PDF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarePlanResident {
    /// Display identity in "Last, First" form
    pub name: String,
    /// Daily fluid target in mL, None when the care plan never states one
    pub ml_goal: Option<u32>,
    /// Daily fluid maximum in mL
    pub ml_maximum: Option<u32>,
    /// Provenance, e.g. "careplan.pdf - Page 3"
    pub source_file: String,
    /// Whether any page bearing the resident's name mentions a feeding tube
    pub has_feeding_tube: bool,
}

impl CarePlanResident {
    /// Create a resident with no goal and no feeding tube.
    pub fn new(name: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ml_goal: None,
            ml_maximum: None,
            source_file: source_file.into(),
            has_feeding_tube: false,
        }
    }

    /// Builder-style goal setter.
    pub fn with_goal(mut self, ml_goal: u32) -> Self {
        self.ml_goal = Some(ml_goal);
        self
    }
}

/// Care-plan resident joined with daily consumption from hydration logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HydrationRecord {
    pub name: String,
    pub ml_goal: Option<u32>,
    pub ml_maximum: Option<u32>,
    pub source_file: String,
    pub has_feeding_tube: bool,
    /// Consumed mL per reporting day
    pub date_data: BTreeMap<NaiveDate, f64>,
    /// Goal missed on a run of consecutive days
    pub missed_3_days: bool,
}

impl From<CarePlanResident> for HydrationRecord {
    fn from(resident: CarePlanResident) -> Self {
        Self {
            name: resident.name,
            ml_goal: resident.ml_goal,
            ml_maximum: resident.ml_maximum,
            source_file: resident.source_file,
            has_feeding_tube: resident.has_feeding_tube,
            date_data: BTreeMap::new(),
            missed_3_days: false,
        }
    }
}

/// Hydration record with infection-control data attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResidentWithIpc {
    pub name: String,
    pub ml_goal: Option<u32>,
    pub ml_maximum: Option<u32>,
    pub source_file: String,
    pub has_feeding_tube: bool,
    pub date_data: BTreeMap<NaiveDate, f64>,
    pub missed_3_days: bool,
    /// Whether an IPC row matched this resident
    pub ipc_found: bool,
    /// Infection name, "-" if none
    pub infection: String,
    /// Infection type, "-" if none
    pub infection_type: String,
}

impl ResidentWithIpc {
    /// Attach IPC findings; blank values collapse to "-".
    pub fn with_ipc(record: HydrationRecord, infection: &str, infection_type: &str) -> Self {
        let mut resident = Self::from(record);
        resident.ipc_found = true;
        resident.infection = or_placeholder(infection);
        resident.infection_type = or_placeholder(infection_type);
        resident
    }

    /// Number of absent or zero values, used to rank duplicate entries.
    pub fn zero_count(&self) -> usize {
        let goal_missing = usize::from(self.ml_goal.unwrap_or(0) == 0);
        goal_missing + self.date_data.values().filter(|v| **v == 0.0).count()
    }
}

impl From<HydrationRecord> for ResidentWithIpc {
    fn from(record: HydrationRecord) -> Self {
        Self {
            name: record.name,
            ml_goal: record.ml_goal,
            ml_maximum: record.ml_maximum,
            source_file: record.source_file,
            has_feeding_tube: record.has_feeding_tube,
            date_data: record.date_data,
            missed_3_days: record.missed_3_days,
            ipc_found: false,
            infection: NO_INFECTION.to_string(),
            infection_type: NO_INFECTION.to_string(),
        }
    }
}

fn or_placeholder(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        NO_INFECTION.to_string()
    } else {
        trimmed.to_string()
    }
}
