//! Hydration-log extraction.
//!
//! Each log page carries one resident header, a `Start Date` and a
//! `Total By Day` row of daily consumption. Pages are joined onto the
//! care-plan roster through the name matcher; pages naming someone outside the
//! roster are reported and skipped.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::config::{DateSource, PipelineConfig};
use crate::models::{CarePlanResident, FileInput, HydrationRecord};
use crate::names::{clean_name, closest_roster_name, convert_to_last_first, NameIndex, NameMatcher};
use crate::pdf::PageExtractor;
use crate::pipeline::RunLog;

/// Days subtracted from the run date when a log carries no date at all.
pub const FALLBACK_START_OFFSET_DAYS: u64 = 2;

const NAME_MARKER: &str = "Resident Name:";
const LOCATION_MARKER: &str = "Resident Location:";

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: LazyLock<Regex> = LazyLock::new(|| {
                Regex::new($pattern).expect(concat!("invalid pattern: ", stringify!($name)))
            });
            &RE
        }
    };
}

cached_regex!(trailing_noise, r"[^A-Z\s'`\x{2018}\x{2019}-]+$");
cached_regex!(
    name_with_id,
    r"([A-Z][A-Z\s'`\x{2018}\x{2019}-]+),\s*([A-Z][A-Z\s'`\x{2018}\x{2019}-]+)\s*\(\d+\)"
);
cached_regex!(
    bare_name,
    r"([A-Z][A-Z\s'`\x{2018}\x{2019}-]+),\s*([A-Z][A-Z\s'`\x{2018}\x{2019}-]+)"
);
cached_regex!(totals_concatenated, r"(?i)Total\s*By\s*Day((?:\d{3,4}\.0)+)");
cached_regex!(concatenated_value, r"(\d{3,4})\.0");
cached_regex!(totals_spaced, r"(?i)Total\s*By\s*Day\s+([\d\s.]+)");
cached_regex!(number, r"(\d+(?:\.\d+)?)");
cached_regex!(resident_name_ahead, r"(?i)^Resident\s*Name:");
cached_regex!(start_date, r"(?i)Start\s*Date:\s*(\d{1,2})/(\d{1,2})/(\d{4})");
cached_regex!(file_date_mdy, r"(?:^|[-_\s])(\d{2})-(\d{2})-(\d{4})(?:[-_\s]|$)");
cached_regex!(file_date_ymd, r"(?:^|[-_\s])(\d{4})-(\d{2})-(\d{2})(?:[-_\s]|$)");

/// Resident name in "LAST, FIRST" form from a log page.
///
/// Tries the `Resident Name: ... Resident Location:` header first, then
/// `LAST, FIRST (ID)`, then a standalone `LAST, FIRST`.
pub fn extract_resident_name(text: &str) -> Option<String> {
    header_name(text)
        .or_else(|| id_name(text))
        .or_else(|| standalone_name(text))
}

fn header_name(text: &str) -> Option<String> {
    let (_, after) = text.split_once(NAME_MARKER)?;
    let section = after.split(NAME_MARKER).next().unwrap_or(after);
    let (raw, _) = section.split_once(LOCATION_MARKER)?;

    let mut name = clean_name(&raw.trim().to_uppercase());
    name = trailing_noise().replace(&name, "").trim().to_string();

    // Stray "R" glued to the end by the PDF layout
    if name.len() > 1 && name.ends_with('R') {
        let chars: Vec<char> = name.chars().collect();
        let second_last = chars[chars.len() - 2];
        if !second_last.is_ascii_uppercase() || chars.len() == 2 {
            name.pop();
        }
    }

    let converted = convert_to_last_first(name.trim());
    (!converted.is_empty()).then_some(converted)
}

fn id_name(text: &str) -> Option<String> {
    let caps = name_with_id().captures(text)?;
    Some(format!("{}, {}", clean_name(&caps[1]), clean_name(&caps[2])))
}

fn standalone_name(text: &str) -> Option<String> {
    let re = bare_name();
    re.captures_iter(text).find_map(|caps| {
        let end = caps.get(0)?.end();
        let rest = text[end..].trim_start();
        let bounded = rest.is_empty()
            || rest.starts_with('(')
            || rest.starts_with(|c: char| c.is_ascii_digit());
        bounded.then(|| format!("{}, {}", clean_name(&caps[1]), clean_name(&caps[2])))
    })
}

/// Daily totals from the `Total By Day` row.
pub fn extract_total_by_day(text: &str) -> Vec<f64> {
    // "Total By Day2200.02250.01275.0"
    if let Some(caps) = totals_concatenated().captures(text) {
        let totals: Vec<f64> = concatenated_value()
            .captures_iter(&caps[1])
            .filter_map(|c| c[1].parse::<f64>().ok())
            .collect();
        if !totals.is_empty() {
            return totals;
        }
    }

    // "Total By Day 1775.0 1850.0" ending the page or followed by the next header
    let totals = spaced_totals(text);
    if !totals.is_empty() {
        return totals;
    }

    text.lines()
        .find(|line| line.contains("Total By Day"))
        .map(|line| spaced_totals(&line.replace(',', "")))
        .unwrap_or_default()
}

fn spaced_totals(text: &str) -> Vec<f64> {
    let next_header = resident_name_ahead();

    totals_spaced()
        .captures_iter(text)
        .find_map(|caps| {
            let end = caps.get(0)?.end();
            let rest = &text[end..];
            (rest.is_empty() || next_header.is_match(rest)).then(|| {
                number()
                    .captures_iter(&caps[1])
                    .filter_map(|c| c[1].parse::<f64>().ok())
                    .collect()
            })
        })
        .unwrap_or_default()
}

/// First `Start Date: M/D/YYYY` on the page.
pub fn extract_start_date(text: &str) -> Option<NaiveDate> {
    let caps = start_date().captures(text)?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?)
}

/// Date token embedded in a file name: `MM-DD-YYYY` or `YYYY-MM-DD`.
pub fn date_from_file_name(file_name: &str) -> Option<NaiveDate> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let mdy = file_date_mdy().captures(stem).and_then(|caps| {
        NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?)
    });

    mdy.or_else(|| {
        let caps = file_date_ymd().captures(stem)?;
        NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    })
}

/// Consecutive days starting at `start`.
pub fn calculate_date_columns(start: NaiveDate, num_days: usize) -> Vec<NaiveDate> {
    (0..num_days as u64)
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .collect()
}

/// True if the goal was missed on `window` consecutive calendar days.
///
/// Every day of the run must be present in `date_data` and below the goal.
/// A missing or non-positive goal never misses.
pub fn calculate_missed_days(
    goal: Option<u32>,
    date_data: &BTreeMap<NaiveDate, f64>,
    window: usize,
) -> bool {
    let goal = match goal {
        Some(g) if g > 0 => f64::from(g),
        _ => return false,
    };
    if window == 0 {
        return false;
    }

    let days: Vec<(NaiveDate, f64)> = date_data.iter().map(|(d, v)| (*d, *v)).collect();
    days.windows(window).any(|run| {
        let consecutive = run.windows(2).all(|pair| pair[0].0.succ_opt() == Some(pair[1].0));
        consecutive && run.iter().all(|(_, value)| *value < goal)
    })
}

/// Most frequent page start date; ties go to the first seen.
fn most_common_start_date(pages: &[String]) -> Option<NaiveDate> {
    let mut counts: Vec<(NaiveDate, usize)> = Vec::new();
    for date in pages.iter().filter_map(|p| extract_start_date(p)) {
        match counts.iter_mut().find(|(d, _)| *d == date) {
            Some((_, count)) => *count += 1,
            None => counts.push((date, 1)),
        }
    }

    let mut best: Option<(NaiveDate, usize)> = None;
    for (date, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((date, count));
        }
    }
    best.map(|(date, _)| date)
}

/// Joins hydration logs onto a care-plan roster.
pub struct HydrationExtractor<'a> {
    config: &'a PipelineConfig,
    matcher: NameMatcher,
    run_date: NaiveDate,
}

impl<'a> HydrationExtractor<'a> {
    pub fn new(config: &'a PipelineConfig, run_date: NaiveDate) -> Self {
        Self {
            config,
            matcher: NameMatcher::new(),
            run_date,
        }
    }

    /// Apply one log document to the roster. `is_extra` adds to existing day values.
    pub fn process_pages(
        &self,
        pages: &[String],
        file_name: &str,
        residents: &mut [HydrationRecord],
        is_extra: bool,
        log: &mut RunLog,
    ) {
        let index = NameIndex::from_names(residents.iter().map(|r| r.name.as_str()));
        let file_date = date_from_file_name(file_name);
        let common_date = most_common_start_date(pages);

        let fallback = match common_date {
            Some(date) => date,
            None => {
                let date = self
                    .run_date
                    .checked_sub_days(Days::new(FALLBACK_START_OFFSET_DAYS))
                    .unwrap_or(self.run_date);
                if file_date.is_none() {
                    log.warn(format!(
                        "No start dates found in {}, using default: {}",
                        file_name,
                        date.format("%m/%d/%Y")
                    ));
                }
                date
            }
        };

        for (page_idx, page) in pages.iter().enumerate() {
            let Some(name) = extract_resident_name(page) else {
                continue;
            };
            let totals = extract_total_by_day(page);
            if totals.is_empty() {
                continue;
            }

            let page_date = extract_start_date(page);
            let start = match self.config.date_source {
                DateSource::Filename => file_date.or(page_date),
                DateSource::Content => page_date.or(file_date),
            };
            let start = start.unwrap_or_else(|| {
                debug!(resident = %name, page = page_idx + 1, "no start date on page, using file default");
                fallback
            });

            let columns = calculate_date_columns(start, totals.len());

            let Some(found) = self.matcher.resolve(&name, &index) else {
                match closest_roster_name(&name, &index) {
                    Some((hint, score)) => log.warn(format!(
                        "Skipping {name} - not found in existing residents (closest: {hint}, {score:.2})"
                    )),
                    None => log.warn(format!("Skipping {name} - not found in existing residents")),
                }
                continue;
            };
            debug!(resident = %name, strategy = found.strategy, "hydration name resolved");

            let record = &mut residents[found.roster_idx];
            let values = totals.iter().map(|t| format!("{t:.1}")).collect::<Vec<_>>().join(", ");
            if is_extra {
                for (day, total) in columns.iter().zip(&totals) {
                    *record.date_data.entry(*day).or_insert(0.0) += total;
                }
                log.info(format!("Processing EXTRA {name}: {values}"));
            } else {
                for (day, total) in columns.iter().zip(&totals) {
                    record.date_data.insert(*day, *total);
                }
                log.info(format!("Processing {name}: {values}"));
            }
        }
    }
}

/// Build hydration records for the roster from every log file.
///
/// Regular files are applied first, then `extra` files; each group in file-name order.
pub fn process_hydration_files(
    files: &[FileInput],
    roster: Vec<CarePlanResident>,
    extractor: &dyn PageExtractor,
    config: &PipelineConfig,
    run_date: NaiveDate,
    log: &mut RunLog,
) -> Vec<HydrationRecord> {
    let mut residents: Vec<HydrationRecord> = roster.into_iter().map(HydrationRecord::from).collect();

    let (mut extra, mut regular): (Vec<&FileInput>, Vec<&FileInput>) =
        files.iter().partition(|f| f.is_extra());
    regular.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    extra.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    log.info(format!(
        "Found {} regular PDFs and {} extra PDFs",
        regular.len(),
        extra.len()
    ));

    let hydration = HydrationExtractor::new(config, run_date);
    let ordered = regular.iter().map(|f| (*f, false)).chain(extra.iter().map(|f| (*f, true)));
    for (file, is_extra) in ordered {
        match extractor.extract_pages(&file.bytes) {
            Ok(doc) => hydration.process_pages(&doc.pages, &file.file_name, &mut residents, is_extra, log),
            Err(e) => log.error(format!("Error processing {}: {}", file.file_name, e)),
        }
    }

    log.info("Calculating \"Missed 3 Days\" status...");
    for resident in &mut residents {
        resident.missed_3_days =
            calculate_missed_days(resident.ml_goal, &resident.date_data, config.missed_days_window);
    }

    residents
}
