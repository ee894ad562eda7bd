//! In-memory ledger for tests and dry runs

use super::{
    dedup_preserving_order, find_anomalies, Ledger, LedgerAnomaly, LedgerResult,
    ResetConfirmation,
};
use std::collections::HashSet;

/// Ledger that keeps its entries in a vector, duplicates and all
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    entries: Vec<String>,
    ids: HashSet<String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw entries, as if read from a file
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries.into_iter().map(Into::into).collect();
        let ids = entries.iter().cloned().collect();
        Self { entries, ids }
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Ledger for MemoryLedger {
    fn load(&mut self) -> LedgerResult<HashSet<String>> {
        Ok(self.ids.clone())
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn mark_done(&mut self, id: &str) -> LedgerResult<()> {
        if self.ids.insert(id.to_string()) {
            self.entries.push(id.to_string());
        }
        Ok(())
    }

    fn completed_count(&self) -> usize {
        self.ids.len()
    }

    fn deduplicate(&mut self) -> LedgerResult<usize> {
        let unique = dedup_preserving_order(&self.entries);
        let removed = self.entries.len() - unique.len();
        self.entries = unique;
        Ok(removed)
    }

    fn verify(&self) -> LedgerResult<Vec<LedgerAnomaly>> {
        Ok(find_anomalies(self.entries.iter().map(String::as_str)))
    }

    fn reset(&mut self, _confirmation: ResetConfirmation) -> LedgerResult<()> {
        self.entries.clear();
        self.ids.clear();
        Ok(())
    }
}
