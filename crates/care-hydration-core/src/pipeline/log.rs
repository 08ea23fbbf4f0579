//! Collecting logger for one pipeline run.

use tracing::{error, info, warn};

/// Records warnings and errors for the run result while emitting tracing events.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress message; emitted but not collected.
    pub fn info(&self, message: impl AsRef<str>) {
        info!("{}", message.as_ref());
    }

    /// Data-quality problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// File-level failure; the file is skipped.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// (errors, warnings)
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.errors, self.warnings)
    }
}
