//! Per-date dashboard generation.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{DashboardData, DashboardResident, ResidentWithIpc, YesNo};
use crate::pipeline::RunLog;

/// Timestamp format in dashboard headers.
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `MM_DD_YYYY`, used in artifact names and archive keys.
pub fn date_key(day: NaiveDate) -> String {
    day.format("%m_%d_%Y").to_string()
}

/// `MM/DD/YYYY`
pub fn date_display(day: NaiveDate) -> String {
    day.format("%m/%d/%Y").to_string()
}

/// Every reporting day across the roster, chronological.
pub fn all_dates(residents: &[ResidentWithIpc]) -> Vec<NaiveDate> {
    residents
        .iter()
        .flat_map(|r| r.date_data.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Dashboard rows for one day; residents without a value on that day show 0.
pub fn dashboard_for_day(residents: &[ResidentWithIpc], day: NaiveDate) -> Vec<DashboardResident> {
    residents
        .iter()
        .filter(|r| !r.name.trim().is_empty())
        .map(|r| DashboardResident {
            name: r.name.clone(),
            goal: r.ml_goal.map(f64::from).unwrap_or(0.0),
            source: r.source_file.clone(),
            missed_3_days: YesNo::from(r.missed_3_days),
            data: r.date_data.get(&day).copied().unwrap_or(0.0),
            ipc_found: YesNo::from(r.ipc_found),
            infection: r.infection.clone(),
            infection_type: r.infection_type.clone(),
        })
        .collect()
}

/// One dashboard per reporting day.
pub fn generate_dashboard_data(
    residents: &[ResidentWithIpc],
    generated_at: NaiveDateTime,
    log: &mut RunLog,
) -> Vec<DashboardData> {
    let dates = all_dates(residents);
    let listed: Vec<String> = dates.iter().map(|d| date_display(*d)).collect();
    log.info(format!("Found {} date columns: {}", dates.len(), listed.join(", ")));

    if dates.is_empty() {
        log.warn("No date columns found!");
        return Vec::new();
    }

    let generated_at = generated_at.format(GENERATED_AT_FORMAT).to_string();
    let mut dashboards = Vec::with_capacity(dates.len());

    for day in dates {
        let rows = dashboard_for_day(residents, day);

        let goal_met = rows.iter().filter(|r| r.goal > 0.0 && r.data >= r.goal).count();
        let missed = rows.iter().filter(|r| r.missed_3_days == YesNo::Yes).count();
        log.info(format!(
            "Generated dashboard for {} with {} residents",
            date_display(day),
            rows.len()
        ));
        log.info(format!("  - Goal met: {goal_met}"));
        log.info(format!("  - Missed 3 days: {missed}"));
        if !rows.is_empty() {
            let pct = goal_met as f64 / rows.len() as f64 * 100.0;
            log.info(format!("  - Goal met percentage: {pct:.1}%"));
        }

        dashboards.push(DashboardData {
            date_key: date_key(day),
            date_display: date_display(day),
            generated_at: generated_at.clone(),
            residents: rows,
        });
    }

    log.info(format!("Generated {} dashboard files", dashboards.len()));
    dashboards
}
