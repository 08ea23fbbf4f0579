//! Duplicate merging and noise filtering for the final roster.

use crate::hydration::calculate_missed_days;
use crate::models::{ResidentWithIpc, NO_INFECTION};
use crate::names::{clean_name, normalize_to_last_first};
use crate::pipeline::RunLog;

/// Invalid-entry names listed individually in the log.
const MAX_LISTED_INVALID: usize = 10;

/// Pick the most complete entry of a duplicate group and fold the rest into it.
fn merge_group(mut entries: Vec<ResidentWithIpc>, missed_window: usize) -> Option<ResidentWithIpc> {
    // Stable: ties keep roster order
    entries.sort_by_key(ResidentWithIpc::zero_count);
    let mut entries = entries.into_iter();
    let mut best = entries.next()?;

    for entry in entries {
        if let Some(goal) = entry.ml_goal.filter(|g| *g > 0) {
            if best.ml_goal.map_or(true, |b| b == 0 || goal > b) {
                best.ml_goal = Some(goal);
            }
        }

        if let Some(max) = entry.ml_maximum.filter(|m| *m > 0) {
            if best.ml_maximum.map_or(true, |b| b == 0 || max > b) {
                best.ml_maximum = Some(max);
            }
        }

        for (day, value) in entry.date_data {
            let current = best.date_data.entry(day).or_insert(0.0);
            if value > *current {
                *current = value;
            }
        }

        best.has_feeding_tube |= entry.has_feeding_tube;

        if entry.ipc_found {
            best.ipc_found = true;
            if best.infection == NO_INFECTION && entry.infection != NO_INFECTION {
                best.infection = entry.infection;
            }
            if best.infection_type == NO_INFECTION && entry.infection_type != NO_INFECTION {
                best.infection_type = entry.infection_type;
            }
        }
    }

    best.missed_3_days = calculate_missed_days(best.ml_goal, &best.date_data, missed_window);
    Some(best)
}

/// Merge duplicates, drop heading noise and sort by name.
///
/// Running this on its own output performs no further merges.
pub fn validate_and_clean_data(
    residents: Vec<ResidentWithIpc>,
    invalid_keywords: &[String],
    missed_window: usize,
    log: &mut RunLog,
) -> Vec<ResidentWithIpc> {
    let mut groups: Vec<(String, Vec<ResidentWithIpc>)> = Vec::new();
    for mut resident in residents {
        resident.name = clean_name(&resident.name);
        if resident.name.is_empty() && resident.ml_goal.is_none() {
            log.warn(format!(
                "Dropping unnamed entry without a goal from {}",
                resident.source_file
            ));
            continue;
        }

        let key = normalize_to_last_first(&resident.name);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, entries)) => entries.push(resident),
            None => groups.push((key, vec![resident])),
        }
    }

    let mut merged = Vec::with_capacity(groups.len());
    for (key, entries) in groups {
        if entries.len() > 1 {
            log.warn(format!("Merging {} entries for: {}", entries.len(), key));
        }
        merged.extend(merge_group(entries, missed_window));
    }

    let keywords: Vec<String> = invalid_keywords.iter().map(|k| k.to_lowercase()).collect();
    let (invalid, mut valid): (Vec<_>, Vec<_>) = merged.into_iter().partition(|r| {
        let lower = r.name.to_lowercase();
        keywords.iter().any(|k| lower.contains(k.as_str()))
    });

    if !invalid.is_empty() {
        log.info(format!("Filtered out {} invalid entries", invalid.len()));
        for resident in invalid.iter().take(MAX_LISTED_INVALID) {
            log.info(format!("  - {}", resident.name));
        }
        if invalid.len() > MAX_LISTED_INVALID {
            log.info(format!("  ... and {} more", invalid.len() - MAX_LISTED_INVALID));
        }
    }

    valid.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    log.info(format!("After cleaning: {} residents remain", valid.len()));
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::models::{CarePlanResident, HydrationRecord};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn resident(name: &str, goal: Option<u32>, data: &[(u32, f64)]) -> ResidentWithIpc {
        let mut plan = CarePlanResident::new(name, "plan.pdf - Page 1");
        plan.ml_goal = goal;
        let mut record = HydrationRecord::from(plan);
        record.date_data = data.iter().map(|(d, v)| (day(*d), *v)).collect();
        record.into()
    }

    fn clean(residents: Vec<ResidentWithIpc>, log: &mut RunLog) -> Vec<ResidentWithIpc> {
        let config = PipelineConfig::default();
        validate_and_clean_data(residents, &config.invalid_keywords, config.missed_days_window, log)
    }

    #[test]
    fn test_merge_duplicates() {
        let mut with_ipc = resident("Doe, Jane Marie", None, &[(1, 0.0), (2, 0.0)]);
        with_ipc.ipc_found = true;
        with_ipc.infection = "UTI".to_string();

        let input = vec![
            resident("Doe,\u{00A0}Jane", Some(1500), &[(1, 900.0), (2, 950.0), (3, 800.0)]),
            with_ipc,
            resident("Roe, Ann", Some(1200), &[]),
        ];

        let mut log = RunLog::new();
        let out = clean(input, &mut log);

        assert_eq!(out.len(), 2);
        let jane = &out[0];
        assert_eq!(jane.name, "Doe, Jane");
        assert_eq!(jane.ml_goal, Some(1500));
        assert!(jane.ipc_found);
        assert_eq!(jane.infection, "UTI");
        assert_eq!(jane.infection_type, "-");
        assert_eq!(jane.date_data.get(&day(1)), Some(&900.0));
        assert!(jane.missed_3_days);
        assert_eq!(log.warnings(), ["Merging 2 entries for: Doe, Jane"]);
    }

    #[test]
    fn test_merge_keeps_highest_goal_and_day_values() {
        let input = vec![
            resident("Doe, Jane", Some(1500), &[(1, 900.0)]),
            resident("Doe, Jane", Some(1800), &[(1, 1000.0), (2, 0.0)]),
        ];

        let mut log = RunLog::new();
        let out = clean(input, &mut log);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ml_goal, Some(1800));
        assert_eq!(out[0].date_data.get(&day(1)), Some(&1000.0));
        assert_eq!(out[0].date_data.get(&day(2)), Some(&0.0));
    }

    #[test]
    fn test_filters_invalid_entries() {
        let input = vec![
            resident("Admission, Record", Some(1500), &[]),
            resident("Disorder, Bowel", None, &[]),
            resident("Roe, Ann", Some(1200), &[]),
        ];

        let mut log = RunLog::new();
        let out = clean(input, &mut log);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Roe, Ann");
    }

    #[test]
    fn test_drops_unnamed_without_goal() {
        let mut log = RunLog::new();
        let out = clean(
            vec![resident("  ", None, &[]), resident("\u{00A0}", Some(1000), &[])],
            &mut log,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ml_goal, Some(1000));
        assert_eq!(log.warnings().len(), 1);
    }

    #[test]
    fn test_sorted_by_name() {
        let mut log = RunLog::new();
        let out = clean(
            vec![
                resident("Roe, Ann", Some(1200), &[]),
                resident("abel, Tom", Some(1200), &[]),
                resident("Doe, Jane", Some(1500), &[]),
            ],
            &mut log,
        );
        let names: Vec<_> = out.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["abel, Tom", "Doe, Jane", "Roe, Ann"]);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let input = vec![
            resident("Doe, Jane", Some(1500), &[(1, 900.0)]),
            resident("Doe, Jane M", None, &[]),
            resident("Roe, Ann", Some(1200), &[]),
        ];

        let mut log = RunLog::new();
        let first = clean(input, &mut log);
        let mut second_log = RunLog::new();
        let second = clean(first.clone(), &mut second_log);

        assert_eq!(first, second);
        assert!(second_log.warnings().is_empty());
    }
}
