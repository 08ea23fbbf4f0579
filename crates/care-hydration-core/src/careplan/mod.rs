//! Care-plan extraction: resident identity, fluid target and feeding-tube status.
//!
//! A resident's section spans many consecutive pages. The name shows up on an
//! early page and the FLUID TARGET on a later one, so targets are associated
//! across pages:
//!
//! 1. A page with names and targets gives its first target to every name on it.
//! 2. A page with names but no target searches forward (never backward), only
//!    accepting a target from a page that still carries one of its names, and
//!    stopping at the first page whose names are all different.
//! 3. A final sweep searches every page mentioning a resident still lacking a target.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::PipelineConfig;
use crate::models::{CarePlanResident, FileInput};
use crate::names::{clean_name, title_case};
use crate::pdf::PageExtractor;
use crate::pipeline::RunLog;

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        // "LAST, FIRST (12345)"
        r"\b([A-Z][A-Za-z\s'-]+,\s+[A-Z][A-Za-z\s'-]+)\s*\(\d{4,}\)",
        // "LAST,FIRST (12345)"
        r"\b([A-Z][A-Za-z\s'-]+,\s*[A-Z][A-Za-z\s'-]+)\s*\(\d{4,}\)",
        // comma optional
        r"\b([A-Z][A-Za-z\s'-]+,?\s+[A-Z][A-Za-z\s'-]+)\s*\(\d{4,}\)",
        // "(123-45)"
        r"\b([A-Z][A-Za-z\s'-]+,\s*[A-Z][A-Za-z\s'-]+)\s*\(\d{3}-\d{2}\)",
        // "(12-34)"
        r"\b([A-Z][A-Za-z\s'-]+,\s*[A-Z][A-Za-z\s'-]+)\s*\(\d{2}-\d{2}\)",
    ])
});

static FEEDING_TUBE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)feeding\s+tube",
        r"(?i)g\s*tube",
        r"(?i)gastrostomy",
        r"(?i)peg\s*tube",
        r"(?i)jejunostomy",
        r"(?i)j\s*tube",
        r"(?i)nasogastric",
        r"(?i)ng\s*tube",
        r"(?i)enteral\s+nutrition",
        r"(?i)tube\s+feeding",
        r"(?i)gastric\s+tube",
    ])
});

static RE_FLUID_TARGET: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)FLUID\s*TARGET[^0-9]*?(\d{3,})\s*ml"));

static RE_FLUID_TARGET_MARKER: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)FLUID\s*TARGET"));

static RE_ML_AMOUNT: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)(\d{3,})\s*ml"));

static RE_FLUID_MAXIMUM: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?is)FLUID\s*TARGET.{0,200}?maximum\D{0,20}?(\d{3,})\s*ml")
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern:?}: {e}"))
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// Resident names in "Last, First" form, first-seen order, header noise removed.
pub fn extract_resident_names(text: &str, skip_phrases: &[String]) -> Vec<String> {
    let skip: Vec<String> = skip_phrases.iter().map(|s| s.to_lowercase()).collect();
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for pattern in NAME_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let name = title_case(&clean_name(&caps[1]));
            let lower = name.to_lowercase();
            if skip.iter().any(|phrase| lower.contains(phrase.as_str())) {
                continue;
            }
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }

    names
}

/// Fluid targets (mL) in order of appearance, deduplicated.
pub fn extract_fluid_targets_ml(text: &str) -> Vec<u32> {
    let mut targets = Vec::new();

    targets.extend(
        RE_FLUID_TARGET
            .captures_iter(text)
            .filter_map(|c| c[1].parse::<u32>().ok()),
    );

    // Line-scoped pass: the lazy global match can skip past a number on its own line
    for line in text.lines().filter(|l| RE_FLUID_TARGET_MARKER.is_match(l)) {
        targets.extend(
            RE_ML_AMOUNT
                .captures_iter(line)
                .filter_map(|c| c[1].parse::<u32>().ok()),
        );
    }

    dedup_preserving_order(targets)
}

/// Fluid maximums (mL) stated after a FLUID TARGET marker.
pub fn extract_fluid_maximums_ml(text: &str) -> Vec<u32> {
    let maximums = RE_FLUID_MAXIMUM
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .collect();
    dedup_preserving_order(maximums)
}

/// True if any feeding-tube phrase appears in the text.
pub fn extract_feeding_tube_info(text: &str) -> bool {
    FEEDING_TUBE_PATTERNS.iter().any(|p| p.is_match(text))
}

fn dedup_preserving_order(values: Vec<u32>) -> Vec<u32> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(*v)).collect()
}

/// Per-page scan results.
struct PageScan {
    names: Vec<String>,
    targets: Vec<u32>,
    maximums: Vec<u32>,
    feeding_tube: bool,
}

/// Care-plan extractor.
pub struct CarePlanExtractor<'a> {
    config: &'a PipelineConfig,
}

impl<'a> CarePlanExtractor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    fn scan(&self, page: &str) -> PageScan {
        PageScan {
            names: extract_resident_names(page, &self.config.skip_phrases),
            targets: extract_fluid_targets_ml(page),
            maximums: extract_fluid_maximums_ml(page),
            feeding_tube: extract_feeding_tube_info(page),
        }
    }

    /// Extract residents from the pages of one care-plan document.
    pub fn process_pages(
        &self,
        pages: &[String],
        file_name: &str,
        log: &mut RunLog,
    ) -> Vec<CarePlanResident> {
        log.info(format!("Processing {} with {} pages", file_name, pages.len()));

        let scans: Vec<PageScan> = pages.iter().map(|p| self.scan(p)).collect();
        let mut targets: HashMap<String, u32> = HashMap::new();
        let mut maximums: HashMap<String, u32> = HashMap::new();
        let mut feeding_tubes: HashSet<String> = HashSet::new();

        for (page_idx, scan) in scans.iter().enumerate() {
            if scan.names.is_empty() {
                continue;
            }

            if scan.feeding_tube {
                feeding_tubes.extend(scan.names.iter().cloned());
            }

            if let Some(&max) = scan.maximums.first() {
                for name in &scan.names {
                    maximums.entry(name.clone()).or_insert(max);
                }
            }

            match scan.targets.first() {
                // Every name on the page gets the first target
                Some(&target) => {
                    for name in &scan.names {
                        targets.entry(name.clone()).or_insert(target);
                    }
                }
                None => self.search_forward(&scans, page_idx, &mut targets),
            }
        }

        if self.config.comprehensive_sweep {
            self.sweep_missing(pages, &scans, &mut targets);
        }

        let mut residents = Vec::new();
        let mut seen = HashSet::new();
        for (page_idx, scan) in scans.iter().enumerate() {
            for name in &scan.names {
                if !seen.insert(name.clone()) {
                    continue;
                }

                let ml_goal = targets.get(name).copied();
                if ml_goal.is_none() {
                    log.warn(format!("No hydration target found for {name}"));
                }

                residents.push(CarePlanResident {
                    name: name.clone(),
                    ml_goal,
                    ml_maximum: maximums.get(name).copied(),
                    source_file: format!("{} - Page {}", file_name, page_idx + 1),
                    has_feeding_tube: feeding_tubes.contains(name),
                });
            }
        }

        log.info(format!(
            "Extracted {} residents from {}",
            residents.len(),
            file_name
        ));
        residents
    }

    fn search_forward(&self, scans: &[PageScan], page_idx: usize, targets: &mut HashMap<String, u32>) {
        let names = &scans[page_idx].names;
        let window_end = (page_idx + self.config.forward_search_pages).min(scans.len() - 1);

        for forward in scans.iter().take(window_end + 1).skip(page_idx + 1) {
            let unnamed = forward.names.is_empty();
            let same_resident = names.iter().any(|n| forward.names.contains(n));

            if !unnamed && !same_resident {
                // Crossed into another resident's section
                return;
            }

            if let Some(&target) = forward.targets.first() {
                for name in names.iter().filter(|n| unnamed || forward.names.contains(n)) {
                    targets.entry(name.clone()).or_insert(target);
                }
                return;
            }
        }
    }

    fn sweep_missing(&self, pages: &[String], scans: &[PageScan], targets: &mut HashMap<String, u32>) {
        let lowered: Vec<String> = pages.iter().map(|p| p.to_lowercase()).collect();
        let missing: Vec<String> = scans
            .iter()
            .flat_map(|s| s.names.iter())
            .filter(|n| !targets.contains_key(*n))
            .cloned()
            .collect();

        for name in missing {
            if targets.contains_key(&name) {
                continue;
            }
            let Some((last, first)) = name.split_once(',') else {
                continue;
            };
            let last = last.trim().to_lowercase();
            let first = first.trim().to_lowercase();
            let full = name.to_lowercase();

            let found = lowered.iter().zip(scans).find_map(|(text, scan)| {
                let mentions = (text.contains(&last) && text.contains(&first)) || text.contains(&full);
                if mentions {
                    scan.targets.first().copied()
                } else {
                    None
                }
            });

            if let Some(target) = found {
                targets.insert(name, target);
            }
        }
    }
}

/// Process every care-plan file; a file that fails to parse is logged and skipped.
pub fn process_care_plans(
    files: &[FileInput],
    extractor: &dyn PageExtractor,
    config: &PipelineConfig,
    log: &mut RunLog,
) -> Vec<CarePlanResident> {
    let care_plans = CarePlanExtractor::new(config);
    let mut residents = Vec::new();

    for file in files {
        match extractor.extract_pages(&file.bytes) {
            Ok(doc) => residents.extend(care_plans.process_pages(&doc.pages, &file.file_name, log)),
            Err(e) => log.error(format!("Error processing {}: {}", file.file_name, e)),
        }
    }

    residents
}
