//! Result Aggregator and run artefacts
//!
//! Tallies per-target results into a [`RunSummary`], keeps the run transcript
//! and writes the distilled success report at the end of a run or pause.

pub mod aggregator;
pub mod run_log;

pub use aggregator::{
    format_target_line, render_summary, write_success_report, Aggregator, RunSummary,
    SuccessPair,
};
pub use run_log::RunLog;

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl crate::core::error_handling::ContextualError for ReportError {
    fn is_user_actionable(&self) -> bool {
        false
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
