//! Infection-control (IPC) merge.
//!
//! IPC sheets are CSV exports with a resident-name column and infection
//! columns. They only ever annotate residents already on the roster.

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::models::{FileInput, HydrationRecord, ResidentWithIpc, NO_INFECTION};
use crate::names::{clean_name, names_match, normalize_to_last_first};
use crate::pipeline::RunLog;

/// IPC parsing errors.
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No resident name column in header")]
    MissingNameColumn,
}

pub type IpcResult<T> = Result<T, IpcError>;

/// One row of an IPC sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcRecord {
    pub resident_name: String,
    pub infection: String,
    pub infection_type: String,
}

/// Parsed sheet: usable rows plus descriptions of rows that could not be read.
#[derive(Debug, Default)]
pub struct IpcSheet {
    pub records: Vec<IpcRecord>,
    pub row_errors: Vec<String>,
}

struct Columns {
    name: usize,
    infection: Option<usize>,
    infection_type: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> IpcResult<Self> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let position = |pred: fn(&str) -> bool| lowered.iter().position(|h| pred(h));

        let name = position(|h| h.contains("resident") && h.contains("name"))
            .ok_or(IpcError::MissingNameColumn)?;
        let infection_type = position(|h| h.contains("infection") && h.contains("type"));
        let infection =
            position(|h| h == "infection" || (h.contains("infection") && !h.contains("type")));

        Ok(Self {
            name,
            infection,
            infection_type,
        })
    }
}

fn field(record: &StringRecord, idx: Option<usize>) -> String {
    let value = idx.and_then(|i| record.get(i)).unwrap_or_default().trim();
    if value.eq_ignore_ascii_case("empty") {
        String::new()
    } else {
        value.to_string()
    }
}

/// Parse one IPC CSV file.
pub fn parse_ipc_csv(bytes: &[u8]) -> IpcResult<IpcSheet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let columns = Columns::from_headers(reader.headers()?)?;
    let mut sheet = IpcSheet::default();

    for (row, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                // Header is line 1
                sheet.row_errors.push(format!("row {}: {}", row + 2, e));
                continue;
            }
        };

        let resident_name = field(&record, Some(columns.name));
        if resident_name.is_empty() {
            continue;
        }

        sheet.records.push(IpcRecord {
            resident_name,
            infection: field(&record, columns.infection),
            infection_type: field(&record, columns.infection_type),
        });
    }

    Ok(sheet)
}

/// IPC findings for one resident, keyed by "Last, First".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcEntry {
    pub name: String,
    pub infection: String,
    pub infection_type: String,
}

/// IPC findings merged across files, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct IpcData {
    entries: Vec<IpcEntry>,
}

impl IpcData {
    /// Merge a record; existing entries only take values they lack.
    pub fn add(&mut self, record: IpcRecord) {
        let name = normalize_to_last_first(&clean_name(&record.resident_name));
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => {
                if existing.infection_type.is_empty() {
                    existing.infection_type = record.infection_type;
                }
                if existing.infection.is_empty() {
                    existing.infection = record.infection;
                }
            }
            None => self.entries.push(IpcEntry {
                name,
                infection: record.infection,
                infection_type: record.infection_type,
            }),
        }
    }

    /// Exact "Last, First" lookup, then token-subset match; returns the entry position.
    pub fn find(&self, resident_name: &str) -> Option<usize> {
        let normalized = normalize_to_last_first(&clean_name(resident_name));
        self.entries
            .iter()
            .position(|e| e.name == normalized)
            .or_else(|| self.entries.iter().position(|e| names_match(resident_name, &e.name)))
    }

    pub fn get(&self, idx: usize) -> Option<&IpcEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpcEntry> {
        self.entries.iter()
    }
}

/// Load and merge every IPC file; unreadable files and rows are logged as errors.
pub fn load_ipc_data(files: &[FileInput], log: &mut RunLog) -> IpcData {
    let mut data = IpcData::default();

    if files.is_empty() {
        log.warn("No IPC CSV files provided");
        return data;
    }
    log.info(format!("Processing {} IPC CSV file(s)", files.len()));

    for file in files {
        match parse_ipc_csv(&file.bytes) {
            Ok(sheet) => {
                log.info(format!(
                    "Processing {}: found {} records",
                    file.file_name,
                    sheet.records.len()
                ));
                for row_error in sheet.row_errors {
                    log.error(format!("Error processing {} {}", file.file_name, row_error));
                }
                for record in sheet.records {
                    data.add(record);
                }
            }
            Err(e) => log.error(format!("Error processing {}: {}", file.file_name, e)),
        }
    }

    log.info(format!("Loaded IPC data for {} unique residents", data.len()));
    data
}

/// Attach IPC findings to every roster resident.
pub fn process_ipc_data(
    records: Vec<HydrationRecord>,
    files: &[FileInput],
    log: &mut RunLog,
) -> Vec<ResidentWithIpc> {
    let data = load_ipc_data(files, log);
    if data.is_empty() {
        log.info("No IPC data found, marking all residents as no IPC");
        return records.into_iter().map(ResidentWithIpc::from).collect();
    }

    let total = records.len();
    let mut matched = vec![false; data.len()];
    let results: Vec<ResidentWithIpc> = records
        .into_iter()
        .map(|record| match data.find(&record.name).and_then(|i| Some((i, data.get(i)?))) {
            Some((idx, entry)) => {
                matched[idx] = true;
                log.info(format!(
                    "Match: '{}' -> '{}' (Infection: {}, Type: {})",
                    record.name,
                    entry.name,
                    placeholder(&entry.infection),
                    placeholder(&entry.infection_type)
                ));
                ResidentWithIpc::with_ipc(record, &entry.infection, &entry.infection_type)
            }
            None => ResidentWithIpc::from(record),
        })
        .collect();

    let found = matched.iter().filter(|m| **m).count();
    log.info(format!("Found {found} matches out of {total} residents"));

    for (entry, _) in data.iter().zip(&matched).filter(|(_, m)| !**m) {
        log.warn(format!("IPC record for {} matched no resident", entry.name));
    }

    results
}

fn placeholder(value: &str) -> &str {
    if value.is_empty() {
        NO_INFECTION
    } else {
        value
    }
}
