//! Scanner Component
//!
//! The scan engine proper: a [`Scheduler`] that drives a [`CredentialTester`]
//! over a target list, consulting the ledger, the health gate and the pause
//! controller at each target boundary.

pub mod batch;
pub mod error;
pub mod manager;
pub mod tester;
pub mod types;

pub use error::{ScanError, ScanResult};
pub use manager::Scheduler;
pub use tester::{BatchOutcome, BatchRequest, CommandTester, CredentialTester, TesterError};
pub use types::{BatchResult, ScanConfig, ScanOutcome, ScanReport, ScanState};

#[cfg(test)]
mod tests;
