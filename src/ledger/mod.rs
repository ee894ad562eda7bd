//! Completion Ledger
//!
//! Persisted set of target ids whose batches have all been attempted. The
//! scheduler skips anything in the ledger, which is what makes a scan
//! resumable: resume is by membership, never by list offset.
//!
//! The [`Ledger`] trait is the seam the scheduler depends on. [`FileLedger`]
//! is the production store (one id per line, append-only, flushed to disk
//! before the scheduler moves on); [`MemoryLedger`] backs the tests.

pub mod file;
pub mod memory;

pub use file::FileLedger;
pub use memory::MemoryLedger;

use crate::core::validation::validate_target_id;
use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl crate::core::error_handling::ContextualError for LedgerError {
    fn is_user_actionable(&self) -> bool {
        false
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Proof that the operator confirmed a destructive reset
///
/// Only obtainable from an explicit affirmative answer.
#[derive(Debug)]
pub struct ResetConfirmation(());

impl ResetConfirmation {
    /// Accepts `yes` (case-insensitive, surrounding whitespace ignored)
    pub fn from_answer(answer: &str) -> Option<Self> {
        answer
            .trim()
            .eq_ignore_ascii_case("yes")
            .then_some(ResetConfirmation(()))
    }
}

/// An advisory finding from [`Ledger::verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAnomaly {
    /// Entry does not look like a host identifier
    Malformed {
        line: usize,
        id: String,
        reason: String,
    },
    /// Entry repeats an earlier line
    Duplicate {
        line: usize,
        first_line: usize,
        id: String,
    },
}

impl std::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerAnomaly::Malformed { line, id, reason } => {
                write!(f, "line {}: malformed id '{}' ({})", line, id, reason)
            }
            LedgerAnomaly::Duplicate {
                line,
                first_line,
                id,
            } => write!(
                f,
                "line {}: duplicate id '{}' (first on line {})",
                line, id, first_line
            ),
        }
    }
}

/// Record of fully processed targets
pub trait Ledger: Send {
    /// Re-read persisted ids; a missing store is an empty ledger
    fn load(&mut self) -> LedgerResult<HashSet<String>>;

    /// Membership check used to skip completed targets
    fn contains(&self, id: &str) -> bool;

    /// Durably record `id` as done before returning
    fn mark_done(&mut self, id: &str) -> LedgerResult<()>;

    /// Number of distinct completed ids
    fn completed_count(&self) -> usize;

    /// Rewrite the store without exact duplicates; returns how many were removed
    fn deduplicate(&mut self) -> LedgerResult<usize>;

    /// Flag malformed and duplicated entries without modifying anything
    fn verify(&self) -> LedgerResult<Vec<LedgerAnomaly>>;

    /// Delete the ledger and transient run markers
    fn reset(&mut self, confirmation: ResetConfirmation) -> LedgerResult<()>;
}

/// Shared anomaly detection over raw ledger entries in file order
pub(crate) fn find_anomalies<'a>(entries: impl Iterator<Item = &'a str>) -> Vec<LedgerAnomaly> {
    let mut anomalies = Vec::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (idx, id) in entries.enumerate() {
        let line = idx + 1;
        if let Err(e) = validate_target_id(id) {
            anomalies.push(LedgerAnomaly::Malformed {
                line,
                id: id.to_string(),
                reason: e.details().to_string(),
            });
        }
        match first_seen.get(id) {
            Some(first_line) => anomalies.push(LedgerAnomaly::Duplicate {
                line,
                first_line: *first_line,
                id: id.to_string(),
            }),
            None => {
                first_seen.insert(id, line);
            }
        }
    }
    anomalies
}

/// Keep the first occurrence of every entry, preserving order
pub(crate) fn dedup_preserving_order(entries: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
