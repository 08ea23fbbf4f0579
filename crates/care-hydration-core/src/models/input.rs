//! Uploaded input files.

use sha2::{Digest, Sha256};

/// An input file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    /// Original file name; date tokens in it key the dashboard output
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// SHA-256 of the file content (hex).
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Hydration files named "...extra..." add to existing day values.
    pub fn is_extra(&self) -> bool {
        self.file_name.to_lowercase().contains("extra")
    }
}
