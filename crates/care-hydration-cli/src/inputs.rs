//! Loading pipeline inputs from directories.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use care_hydration_core::{FileInput, PipelineInputs};

/// Extensions read from a care-plan or hydration directory.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Extensions read from an IPC directory.
const IPC_EXTENSIONS: &[&str] = &["csv"];

/// Directories holding each kind of input.
#[derive(Debug, Clone, Default)]
pub struct InputDirs {
    pub care_plans: PathBuf,
    pub hydration: Option<PathBuf>,
    pub ipc: Option<PathBuf>,
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Read every matching file in `dir`, sorted by file name.
pub fn read_dir_files(dir: &Path, extensions: &[&str]) -> Result<Vec<FileInput>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed reading directory {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("Failed listing {}", dir.display()))?
            .path();
        if path.is_file() && has_extension(&path, extensions) {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let bytes = fs::read(&path).with_context(|| format!("Failed reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(FileInput::new(file_name, bytes))
        })
        .collect()
}

/// Load all inputs; missing optional directories yield no files of that kind.
pub fn load_inputs(dirs: &InputDirs) -> Result<PipelineInputs> {
    let optional = |dir: &Option<PathBuf>, extensions: &[&str]| -> Result<Vec<FileInput>> {
        match dir {
            Some(dir) => read_dir_files(dir, extensions),
            None => Ok(Vec::new()),
        }
    };

    Ok(PipelineInputs {
        care_plans: read_dir_files(&dirs.care_plans, DOCUMENT_EXTENSIONS)?,
        hydration: optional(&dirs.hydration, DOCUMENT_EXTENSIONS)?,
        ipc: optional(&dirs.ipc, IPC_EXTENSIONS)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_inputs_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let plans = tmp.path().join("plans");
        let ipc = tmp.path().join("ipc");
        fs::create_dir_all(&plans).unwrap();
        fs::create_dir_all(&ipc).unwrap();

        fs::write(plans.join("b.pdf"), "b").unwrap();
        fs::write(plans.join("a.TXT"), "a").unwrap();
        fs::write(plans.join("notes.docx"), "x").unwrap();
        fs::write(ipc.join("ipc.csv"), "Resident Name,Infection\n").unwrap();

        let inputs = load_inputs(&InputDirs {
            care_plans: plans,
            hydration: None,
            ipc: Some(ipc),
        })
        .unwrap();

        let names: Vec<_> = inputs.care_plans.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.TXT", "b.pdf"]);
        assert!(inputs.hydration.is_empty());
        assert_eq!(inputs.ipc.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_inputs(&InputDirs {
            care_plans: tmp.path().join("nope"),
            ..InputDirs::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed reading directory"));
    }
}
