//! Scanner Error Types

use crate::core::error_handling::ContextualError;
use crate::ledger::LedgerError;
use crate::report::ReportError;
use crate::state::StateError;

/// Errors that abort a scan. Tester failures are not here: a failed batch
/// counts as zero successes and the run carries on.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl ContextualError for ScanError {
    fn is_user_actionable(&self) -> bool {
        match self {
            ScanError::Ledger(e) => e.is_user_actionable(),
            ScanError::State(e) => e.is_user_actionable(),
            ScanError::Report(e) => e.is_user_actionable(),
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
