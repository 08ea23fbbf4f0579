//! `hydration_goals.csv`, the legacy import format.

use crate::dashboard::{all_dates, date_display};
use crate::models::ResidentWithIpc;

/// Columns before the per-day values.
const BASE_COLUMNS: [&str; 6] = [
    "Resident Name",
    "mL Goal",
    "mL Maximum",
    "Source File",
    "Has Feeding Tube",
    "Missed 3 Days",
];

/// Columns after the per-day values.
const IPC_COLUMNS: [&str; 3] = ["IPC Found", "Infection", "Infection Type"];

/// Render the roster with one column per reporting day.
pub fn generate_csv_content(residents: &[ResidentWithIpc]) -> String {
    let dates = all_dates(residents);

    let header: Vec<String> = BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(dates.iter().map(|d| date_display(*d)))
        .chain(IPC_COLUMNS.iter().map(|c| c.to_string()))
        .collect();

    let mut lines = vec![header.join(",")];

    for resident in residents {
        let mut values = vec![
            escape_csv(&resident.name),
            resident.ml_goal.map(|g| g.to_string()).unwrap_or_default(),
            resident.ml_maximum.map(|m| m.to_string()).unwrap_or_default(),
            escape_csv(&resident.source_file),
            if resident.has_feeding_tube { "Yes" } else { "No" }.to_string(),
            if resident.missed_3_days { "yes" } else { "no" }.to_string(),
        ];

        values.extend(dates.iter().map(|d| {
            resident
                .date_data
                .get(d)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));

        values.push(if resident.ipc_found { "yes" } else { "no" }.to_string());
        values.push(escape_csv(&resident.infection));
        values.push(escape_csv(&resident.infection_type));

        lines.push(values.join(","));
    }

    lines.join("\n")
}

/// Quote a CSV field if it contains a comma, quote or newline.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
